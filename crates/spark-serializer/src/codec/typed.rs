use std::any::type_name;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use crate::codec::DefaultDeserializer;
use crate::error::SerializationError;
use crate::object::Object;
use crate::strategy::Deserializer;

/// 把产出 `Box<dyn Object>` 的反序列化器适配为产出具体类型 `T` 的反序列化器。
///
/// # 设计初衷（Why）
/// - 默认反序列化器在运行时才知道帧中是什么类型，只能返回对象层结果；
/// - 多数调用方在编译期就知道期望类型，适配器负责下转型并把类型不符报告为
///   [`SerializationError::TypeMismatch`]。
///
/// # 契约说明（What）
/// - 流读取、类型解析、负载解码的失败由内部策略原样传播；
/// - 仅当解码成功但类型不符时才产生 `TypeMismatch`。
///
/// ```rust
/// use spark_serializer::{Deserializer, DefaultSerializer, Serializer, TypedDeserializer};
///
/// let bytes = DefaultSerializer::new().serialize_to_bytes(&7_u32).unwrap();
/// let typed = TypedDeserializer::<u32>::default();
/// assert_eq!(typed.deserialize_from_slice(&bytes).unwrap(), 7);
/// ```
pub struct TypedDeserializer<T, D = DefaultDeserializer> {
    inner: D,
    _marker: PhantomData<fn() -> T>,
}

impl<T, D> TypedDeserializer<T, D> {
    /// 包装对象层反序列化器。
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// 访问内部策略。
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// 取回内部策略。
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<T, D: Default> Default for TypedDeserializer<T, D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<T, D: Clone> Clone for TypedDeserializer<T, D> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T, D: fmt::Debug> fmt::Debug for TypedDeserializer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedDeserializer")
            .field("target", &type_name::<T>())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T, D> Deserializer<T> for TypedDeserializer<T, D>
where
    T: Object,
    D: Deserializer<Box<dyn Object>>,
{
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError> {
        let object = self.inner.deserialize(source)?;
        let actual = (*object).type_name();
        object
            .downcast::<T>()
            .map(|concrete| *concrete)
            .map_err(|_| SerializationError::TypeMismatch {
                expected: type_name::<T>(),
                actual,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DefaultSerializer;
    use crate::error::codes;
    use crate::strategy::Serializer;

    #[test]
    fn matching_type_is_unwrapped() {
        let bytes = DefaultSerializer::new()
            .serialize_to_bytes(&vec![String::from("a"), String::from("b")])
            .expect("编码");
        let typed = TypedDeserializer::<Vec<String>>::default();
        assert_eq!(
            typed.deserialize_from_slice(&bytes).expect("解码"),
            vec!["a".to_owned(), "b".to_owned()]
        );
        assert_eq!(typed.strategy_name(), "TypedDeserializer");
    }

    #[test]
    fn other_type_is_a_mismatch() {
        let bytes = DefaultSerializer::new()
            .serialize_to_bytes(&true)
            .expect("编码");
        let err = TypedDeserializer::<u64>::default()
            .deserialize_from_slice(&bytes)
            .expect_err("类型不符");
        assert_eq!(err.code(), codes::SERIALIZER_TYPE_MISMATCH);
        assert_eq!(
            err.to_string(),
            "expected decoded object of type `u64`, found `bool`"
        );
    }
}
