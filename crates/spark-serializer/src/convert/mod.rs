//! 转换管线适配器。
//!
//! # 模块定位（Why）
//! - 通用的值转换管线只认识 `(输入) -> Result<输出, 转换失败>` 这一种契约，
//!   不关心序列化的细节；
//! - 本模块把序列化策略包装成这种契约，并把策略的各种失败收敛为一个统一的
//!   [`ConversionError`]，原始失败保留在错误链上。
//!
//! # 契约说明（What）
//! - 适配器在构造时独占一个策略实例，之后不可替换；
//! - 只有适配器做失败翻译；策略自身与 [`SerializationDelegate`](crate::SerializationDelegate)
//!   一律原样传播；
//! - 策略内部的 panic 属于编程错误，不会被翻译为转换失败。

mod deserializing;
mod serializing;

use std::fmt;

use thiserror::Error;

use crate::error::{SerializationError, codes};

pub use deserializing::DeserializingConverter;
pub use serializing::SerializingConverter;

/// 通用转换契约：把 `S` 转换为 `T`。
pub trait Converter<S: ?Sized, T> {
    /// 执行转换。
    fn convert(&self, source: &S) -> Result<T, ConversionError>;
}

/// 转换方向。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ConversionDirection {
    /// 对象 → 字节。
    Serialize,
    /// 字节 → 对象。
    Deserialize,
}

impl fmt::Display for ConversionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversionDirection::Serialize => "serialize",
            ConversionDirection::Deserialize => "deserialize",
        })
    }
}

/// 转换适配器统一抛出的失败。
///
/// # 设计背景（Why）
/// - 管线调用方只需要知道“转换失败了”，因此具体失败种类在这里被收敛；
/// - 排障仍需要细节：错误消息点名底层策略，`source()` 返回原始的 [`SerializationError`]。
///
/// # 契约说明（What）
/// - [`ConversionError::code`] 恒为 [`codes::CONVERSION_FAILED`]；
/// - 反序列化方向的消息提示字节可能并非由对应的序列化器产出。
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConversionError {
    direction: ConversionDirection,
    strategy: &'static str,
    message: String,
    #[source]
    cause: SerializationError,
}

impl ConversionError {
    pub(crate) fn deserialize(strategy: &'static str, cause: SerializationError) -> Self {
        Self {
            direction: ConversionDirection::Deserialize,
            strategy,
            message: format!(
                "Failed to deserialize payload. Is the byte array a result of corresponding serialization for {strategy}?"
            ),
            cause,
        }
    }

    pub(crate) fn serialize(strategy: &'static str, cause: SerializationError) -> Self {
        Self {
            direction: ConversionDirection::Serialize,
            strategy,
            message: format!("Failed to serialize object using {strategy}"),
            cause,
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        codes::CONVERSION_FAILED
    }

    /// 失败的转换方向。
    pub fn direction(&self) -> ConversionDirection {
        self.direction
    }

    /// 底层策略的简单类型名。
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// 原始失败。
    pub fn cause(&self) -> &SerializationError {
        &self.cause
    }

    /// 取回原始失败。
    pub fn into_cause(self) -> SerializationError {
        self.cause
    }
}
