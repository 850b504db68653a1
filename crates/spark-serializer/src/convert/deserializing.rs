use std::sync::Arc;

use tracing::debug;

use crate::codec::DefaultDeserializer;
use crate::convert::{ConversionError, Converter};
use crate::resolver::TypeResolver;
use crate::strategy::Deserializer;

/// 把 [`Deserializer`] 适配为 `&[u8] -> T` 的转换器。
///
/// 任何反序列化失败都被翻译为 [`ConversionError`]，消息中点名策略的简单类型名。
///
/// ```rust
/// use spark_serializer::{Converter, DefaultSerializer, DeserializingConverter, Object, Serializer};
///
/// let bytes = DefaultSerializer::new().serialize_to_bytes(&7_u16).unwrap();
/// let value: Box<dyn Object> = DeserializingConverter::new().convert(&bytes[..]).unwrap();
/// assert_eq!(value.downcast_ref::<u16>(), Some(&7));
/// ```
#[derive(Clone, Debug)]
pub struct DeserializingConverter<D = DefaultDeserializer> {
    deserializer: D,
}

impl DeserializingConverter {
    /// 使用进程级解析上下文的默认反序列化器。
    pub fn new() -> Self {
        Self::with_deserializer(DefaultDeserializer::new())
    }

    /// 使用指定解析上下文的默认反序列化器。
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self::with_deserializer(DefaultDeserializer::with_resolver(resolver))
    }
}

impl Default for DeserializingConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> DeserializingConverter<D> {
    /// 使用自定义反序列化器。
    pub fn with_deserializer(deserializer: D) -> Self {
        Self { deserializer }
    }

    /// 被包装的反序列化器。
    pub fn deserializer(&self) -> &D {
        &self.deserializer
    }
}

impl<T, D> Converter<[u8], T> for DeserializingConverter<D>
where
    D: Deserializer<T>,
{
    fn convert(&self, source: &[u8]) -> Result<T, ConversionError> {
        let mut stream = source;
        self.deserializer.deserialize(&mut stream).map_err(|cause| {
            let strategy = self.deserializer.strategy_name();
            debug!(
                strategy,
                code = cause.code(),
                error = %cause,
                "deserializing conversion failed"
            );
            ConversionError::deserialize(strategy, cause)
        })
    }
}
