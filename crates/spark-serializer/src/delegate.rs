//! 序列化委托：把一个序列化器与一个反序列化器组合成一个可注入的整体。
//!
//! # 设计背景（Why）
//! - 容器组件通常只想注入“本组件的序列化策略”这一个对象；
//! - 两个方向相互独立，可以任意组合，例如自定义序列化器搭配默认反序列化器。
//!
//! # 契约说明（What）
//! - 委托只做转发，不翻译任何失败；
//! - 两半之间“使用兼容编码”由调用方保证，类型系统不做约束；
//! - 缺少任一半时在构造阶段立即失败，不会拖到首次调用。

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{DefaultDeserializer, DefaultSerializer};
use crate::error::SerializationError;
use crate::object::{Object, peel};
use crate::resolver::{TypeResolver, ambient};
use crate::strategy::{Deserializer, Serializer};

type SharedSerializer = Arc<dyn Serializer<dyn Object>>;
type SharedDeserializer = Arc<dyn Deserializer<Box<dyn Object>>>;

/// 组合序列化器与反序列化器的委托。
///
/// ```rust
/// use spark_serializer::{Deserializer, SerializationDelegate, Serializer};
///
/// let delegate = SerializationDelegate::default();
/// let bytes = delegate.serialize_to_bytes(&3.5_f64).unwrap();
/// let value = delegate.deserialize_from_slice(&bytes).unwrap();
/// assert_eq!(value.downcast_ref::<f64>(), Some(&3.5));
/// ```
#[derive(Clone)]
pub struct SerializationDelegate {
    serializer: SharedSerializer,
    deserializer: SharedDeserializer,
}

impl SerializationDelegate {
    /// 以同一解析上下文构造默认序列化器与默认反序列化器。
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            serializer: Arc::new(DefaultSerializer::with_resolver(Arc::clone(&resolver))),
            deserializer: Arc::new(DefaultDeserializer::with_resolver(resolver)),
        }
    }

    /// 以显式给出的两半构造委托。
    pub fn new<S, D>(serializer: S, deserializer: D) -> Self
    where
        S: Serializer<dyn Object> + 'static,
        D: Deserializer<Box<dyn Object>> + 'static,
    {
        Self {
            serializer: Arc::new(serializer),
            deserializer: Arc::new(deserializer),
        }
    }

    /// 分步装配委托，缺失的一半在 [`SerializationDelegateBuilder::build`] 时报告。
    pub fn builder() -> SerializationDelegateBuilder {
        SerializationDelegateBuilder::default()
    }

    /// 序列化方向的策略。
    pub fn serializer(&self) -> &dyn Serializer<dyn Object> {
        &*self.serializer
    }

    /// 反序列化方向的策略。
    pub fn deserializer(&self) -> &dyn Deserializer<Box<dyn Object>> {
        &*self.deserializer
    }
}

impl Default for SerializationDelegate {
    fn default() -> Self {
        Self::with_resolver(ambient())
    }
}

impl fmt::Debug for SerializationDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationDelegate")
            .field("serializer", &self.serializer.strategy_name())
            .field("deserializer", &self.deserializer.strategy_name())
            .finish()
    }
}

impl<T> Serializer<T> for SerializationDelegate
where
    T: Object + ?Sized,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        self.serializer.serialize(peel(value.as_object()), sink)
    }

    fn serialize_to_bytes(&self, value: &T) -> Result<Bytes, SerializationError> {
        self.serializer.serialize_to_bytes(peel(value.as_object()))
    }
}

impl Deserializer<Box<dyn Object>> for SerializationDelegate {
    fn deserialize(&self, source: &mut dyn Read) -> Result<Box<dyn Object>, SerializationError> {
        self.deserializer.deserialize(source)
    }

    fn deserialize_from_slice(&self, bytes: &[u8]) -> Result<Box<dyn Object>, SerializationError> {
        self.deserializer.deserialize_from_slice(bytes)
    }
}

/// [`SerializationDelegate`] 的构建器。
#[derive(Default)]
pub struct SerializationDelegateBuilder {
    serializer: Option<SharedSerializer>,
    deserializer: Option<SharedDeserializer>,
}

impl SerializationDelegateBuilder {
    /// 设置序列化器。
    pub fn with_serializer<S>(mut self, serializer: S) -> Self
    where
        S: Serializer<dyn Object> + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// 设置反序列化器。
    pub fn with_deserializer<D>(mut self, deserializer: D) -> Self
    where
        D: Deserializer<Box<dyn Object>> + 'static,
    {
        self.deserializer = Some(Arc::new(deserializer));
        self
    }

    /// 构建委托。
    ///
    /// 任一半缺失时返回 [`SerializationError::Precondition`]。
    pub fn build(self) -> Result<SerializationDelegate, SerializationError> {
        let serializer = self
            .serializer
            .ok_or_else(|| SerializationError::precondition("Serializer must not be null"))?;
        let deserializer = self
            .deserializer
            .ok_or_else(|| SerializationError::precondition("Deserializer must not be null"))?;
        Ok(SerializationDelegate {
            serializer,
            deserializer,
        })
    }
}

impl fmt::Debug for SerializationDelegateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationDelegateBuilder")
            .field(
                "serializer",
                &self.serializer.as_ref().map(|s| s.strategy_name()),
            )
            .field(
                "deserializer",
                &self.deserializer.as_ref().map(|d| d.strategy_name()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    #[test]
    fn builder_rejects_missing_halves_before_any_call() {
        let err = SerializationDelegate::builder()
            .with_deserializer(DefaultDeserializer::new())
            .build()
            .expect_err("缺少序列化器");
        assert_eq!(err.code(), codes::SERIALIZER_PRECONDITION);
        assert_eq!(err.to_string(), "Serializer must not be null");

        let err = SerializationDelegate::builder()
            .with_serializer(DefaultSerializer::new())
            .build()
            .expect_err("缺少反序列化器");
        assert_eq!(err.to_string(), "Deserializer must not be null");
    }

    #[test]
    fn default_delegate_round_trips() {
        let delegate = SerializationDelegate::default();
        let bytes = delegate
            .serialize_to_bytes(&String::from("hello"))
            .expect("编码");
        let value = delegate.deserialize_from_slice(&bytes).expect("解码");
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("hello"));

        let again = delegate.serialize_to_bytes(&value).expect("解码结果可再次编码");
        assert_eq!(again, bytes);
    }

    #[test]
    fn debug_lists_strategy_names() {
        let delegate = SerializationDelegate::default();
        assert_eq!(
            format!("{delegate:?}"),
            "SerializationDelegate { serializer: \"DefaultSerializer\", deserializer: \"DefaultDeserializer\" }"
        );
        assert_eq!(
            format!("{:?}", SerializationDelegate::builder()),
            "SerializationDelegateBuilder { serializer: None, deserializer: None }"
        );
    }
}
