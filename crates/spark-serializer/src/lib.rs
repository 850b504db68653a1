#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `spark-serializer` 提供可插拔的对象序列化策略，以及把策略接入通用转换管线的适配器。
//!
//! # 教案背景（Why）
//! - 缓存、会话、RPC 负载等容器组件都需要“对象 ↔ 字节”的能力，但不应绑定到某一种编码；
//! - 因此把两个方向抽象为 [`Serializer`] 与 [`Deserializer`] 两个独立策略，
//!   并提供默认编解码器、转换适配器与组合委托，覆盖最常见的装配方式。
//!
//! # 使用概览（How）
//! - 直接使用 [`DefaultSerializer`]/[`DefaultDeserializer`]，它们在 [`TypeResolver`] 中查找类型绑定，
//!   未指定时使用进程级注册表 [`ambient`]；
//! - 在通用转换管线中注册 [`SerializingConverter`] 与 [`DeserializingConverter`]；
//! - 组件只需注入一个对象时，使用 [`SerializationDelegate`] 组合两个方向。
//!
//! # 合约说明（What）
//! - 策略从不关闭或持有调用方的流；字节数组便捷方法与流式原语产出逐位一致的结果；
//! - 策略与委托原样传播 [`SerializationError`]，只有转换适配器把失败翻译为 [`ConversionError`]；
//! - 所有组件构造后不可变，可在线程间共享，前提是每次调用各自使用独立的流。
//!
//! # 风险提示（Trade-offs）
//! - 默认编解码器的帧格式（见 [`codec::frame`]）只保证本库内部互通，不是跨语言交换格式；
//! - 负载使用 `bincode` 编码，类型的 `serde` 表示一旦变化，旧字节将无法解码。
//!
//! ```rust
//! use spark_serializer::{
//!     Converter, DeserializingConverter, Object, SerializingConverter,
//! };
//!
//! let bytes = SerializingConverter::new().convert(&String::from("hello")).unwrap();
//! let value: Box<dyn Object> = DeserializingConverter::new().convert(&bytes[..]).unwrap();
//! assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("hello"));
//! ```

pub mod codec;
pub mod convert;
pub mod delegate;
pub mod error;
pub mod object;
pub mod resolver;
pub mod settings;
pub mod strategy;

pub use bytes::Bytes;

pub use crate::codec::{DefaultDeserializer, DefaultSerializer, FrameRole, TypedDeserializer};
pub use crate::convert::{
    ConversionDirection, ConversionError, Converter, DeserializingConverter, SerializingConverter,
};
pub use crate::delegate::{SerializationDelegate, SerializationDelegateBuilder};
pub use crate::error::{ErrorCategory, SerializationError, UnresolvedTypeError, codes};
pub use crate::object::Object;
pub use crate::resolver::{AMBIENT_CONTEXT, TypeBinding, TypeRegistry, TypeResolver, ambient};
pub use crate::settings::{CodecSettings, SettingsError};
pub use crate::strategy::{
    DEFAULT_BUFFER_CAPACITY, Deserializer, FnDeserializer, FnSerializer, Serializer,
    deserializer_fn, serializer_fn,
};
