use bytes::Bytes;
use tracing::debug;

use crate::codec::DefaultSerializer;
use crate::convert::{ConversionError, Converter};
use crate::strategy::Serializer;

/// 把 [`Serializer`] 适配为 `&T -> Bytes` 的转换器。
///
/// 转换结果与直接调用 [`Serializer::serialize_to_bytes`] 逐字节一致；失败时返回
/// 点名策略的 [`ConversionError`]。
#[derive(Clone, Debug)]
pub struct SerializingConverter<S = DefaultSerializer> {
    serializer: S,
}

impl SerializingConverter {
    /// 使用进程级解析上下文的默认序列化器。
    pub fn new() -> Self {
        Self::with_serializer(DefaultSerializer::new())
    }
}

impl Default for SerializingConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SerializingConverter<S> {
    /// 使用自定义序列化器。
    pub fn with_serializer(serializer: S) -> Self {
        Self { serializer }
    }

    /// 被包装的序列化器。
    pub fn serializer(&self) -> &S {
        &self.serializer
    }
}

impl<T, S> Converter<T, Bytes> for SerializingConverter<S>
where
    T: ?Sized,
    S: Serializer<T>,
{
    fn convert(&self, source: &T) -> Result<Bytes, ConversionError> {
        self.serializer.serialize_to_bytes(source).map_err(|cause| {
            let strategy = self.serializer.strategy_name();
            debug!(
                strategy,
                code = cause.code(),
                error = %cause,
                "serializing conversion failed"
            );
            ConversionError::serialize(strategy, cause)
        })
    }
}
