use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use tracing::warn;

use crate::codec::frame::{FrameRole, read_frame, write_frame};
use crate::error::{SerializationError, UnresolvedTypeError};
use crate::object::{Object, peel};
use crate::resolver::{TypeResolver, ambient};
use crate::settings::CodecSettings;
use crate::strategy::{Deserializer, Serializer};

const DEFAULT_SERIALIZER: &str = "DefaultSerializer";

/// 默认序列化策略：把对象写成一帧“类型键 + `bincode` 负载”。
///
/// # 设计初衷（Why）
/// - 调用方手里常常只有 `&dyn Object`，序列化器必须在运行时判定该对象能否编码；
/// - “可序列化”由解析上下文定义：只有在 [`TypeResolver`] 中登记过的具体类型才会被接受。
///
/// # 行为逻辑（How）
/// 1. 剥离 `Box<dyn Object>` 包装，按具体类型的 `TypeId` 查找绑定；
/// 2. 找不到绑定时返回 [`SerializationError::NotSerializable`]，并报告对象的运行时类型名；
/// 3. 编码负载、检查限额、写出整帧，最后刷新 `sink`。
///
/// # 契约说明（What）
/// - 构造后不可变，可在线程间共享；克隆只复制两个引用计数与一份配置；
/// - 不关闭 `sink`，也不写出帧以外的任何字节。
///
/// ```rust
/// use spark_serializer::{DefaultDeserializer, DefaultSerializer, Deserializer, Serializer};
///
/// let bytes = DefaultSerializer::new().serialize_to_bytes(&String::from("hello")).unwrap();
/// let decoded = DefaultDeserializer::new().deserialize_from_slice(&bytes).unwrap();
/// assert_eq!(decoded.downcast_ref::<String>().map(String::as_str), Some("hello"));
/// ```
#[derive(Clone)]
pub struct DefaultSerializer {
    resolver: Arc<dyn TypeResolver>,
    settings: CodecSettings,
}

impl DefaultSerializer {
    /// 使用进程级解析上下文。
    pub fn new() -> Self {
        Self::with_resolver(ambient())
    }

    /// 使用指定的解析上下文。
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver,
            settings: CodecSettings::default(),
        }
    }

    /// 替换限额配置。
    pub fn with_settings(mut self, settings: CodecSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 当前解析上下文。
    pub fn resolver(&self) -> &Arc<dyn TypeResolver> {
        &self.resolver
    }

    /// 当前限额配置。
    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }
}

impl Default for DefaultSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSerializer")
            .field("resolver", &self.resolver.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl<T> Serializer<T> for DefaultSerializer
where
    T: Object + ?Sized,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        let object = peel(value.as_object());
        let binding = self
            .resolver
            .resolve_type(object.concrete_type_id())
            .ok_or_else(|| SerializationError::NotSerializable {
                strategy: DEFAULT_SERIALIZER,
                type_name: object.type_name(),
            })?;
        let payload = binding
            .encode(object)
            .map_err(|source| SerializationError::Payload {
                role: FrameRole::Encoder,
                type_key: binding.key().to_owned(),
                source,
            })?;
        write_frame(sink, binding.key(), &payload, &self.settings)?;
        sink.flush()?;
        Ok(())
    }

    fn strategy_name(&self) -> &'static str {
        DEFAULT_SERIALIZER
    }
}

/// 默认反序列化策略：读取一帧并在解析上下文中还原对象。
///
/// # 契约说明（What）
/// - 类型键在当前上下文中不可解析时返回 [`SerializationError::UnresolvedType`]，
///   其 `source()` 为 [`UnresolvedTypeError`]，携带类型键与上下文名称；
/// - 只消费一帧，`source` 中后续字节原样保留给调用方；
/// - 结果为 `Box<dyn Object>`；需要具体类型时使用
///   [`TypedDeserializer`](crate::codec::TypedDeserializer)。
#[derive(Clone)]
pub struct DefaultDeserializer {
    resolver: Arc<dyn TypeResolver>,
    settings: CodecSettings,
}

impl DefaultDeserializer {
    /// 使用进程级解析上下文。
    pub fn new() -> Self {
        Self::with_resolver(ambient())
    }

    /// 使用指定的解析上下文。
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver,
            settings: CodecSettings::default(),
        }
    }

    /// 替换限额配置。
    pub fn with_settings(mut self, settings: CodecSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 当前解析上下文。
    pub fn resolver(&self) -> &Arc<dyn TypeResolver> {
        &self.resolver
    }

    /// 当前限额配置。
    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }
}

impl Default for DefaultDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultDeserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultDeserializer")
            .field("resolver", &self.resolver.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Deserializer<Box<dyn Object>> for DefaultDeserializer {
    fn deserialize(&self, source: &mut dyn Read) -> Result<Box<dyn Object>, SerializationError> {
        let frame = read_frame(source, &self.settings)?;
        let Some(binding) = self.resolver.resolve_key(frame.type_key()) else {
            warn!(
                type_key = frame.type_key(),
                context = self.resolver.name(),
                "type key is not resolvable in resolution context"
            );
            return Err(SerializationError::UnresolvedType(UnresolvedTypeError::new(
                frame.type_key(),
                self.resolver.name(),
            )));
        };
        binding
            .decode(frame.payload())
            .map_err(|source| SerializationError::Payload {
                role: FrameRole::Decoder,
                type_key: frame.type_key().to_owned(),
                source,
            })
    }

    fn strategy_name(&self) -> &'static str {
        "DefaultDeserializer"
    }
}
