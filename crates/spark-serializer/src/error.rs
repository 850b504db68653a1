//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为序列化策略、默认编解码器与委托对象提供统一的失败语义；
//! - 按“流不可读 / 流可读但语义不可解析 / 调用前置条件被违反 / 自定义策略失败”归档，
//!   便于调用方通过 [`SerializationError::category`] 或错误链做分支处理。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，保证与 `std::error::Error` 生态兼容；
//! - 每个变体都映射到 [`codes`] 中的稳定错误码，日志与指标只依赖错误码聚合；
//! - 只有转换器（见 [`crate::convert`]）会把这里的错误翻译成统一的转换失败，其余组件原样传播。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::codec::FrameRole;

/// 稳定错误码。
///
/// 命名遵循 `<域>.<语义>`，日志与指标按错误码聚合。
pub mod codes {
    /// 读写序列化流时发生的 I/O 故障。
    pub const SERIALIZER_IO: &str = "serializer.io";
    /// 流中记录的类型键无法在当前解析上下文中还原。
    pub const SERIALIZER_UNRESOLVED_TYPE: &str = "serializer.unresolved_type";
    /// 流结构不符合帧格式（魔数、版本、类型键编码等）。
    pub const SERIALIZER_MALFORMED: &str = "serializer.malformed";
    /// 类型键或负载长度超出 [`CodecSettings`](crate::CodecSettings) 上限。
    pub const SERIALIZER_LIMIT_EXCEEDED: &str = "serializer.limit_exceeded";
    /// 负载编解码失败。
    pub const SERIALIZER_PAYLOAD: &str = "serializer.payload";
    /// 待编码对象的运行时类型不具备序列化能力。
    pub const SERIALIZER_NOT_SERIALIZABLE: &str = "serializer.not_serializable";
    /// 解码结果与调用方期望的类型不一致。
    pub const SERIALIZER_TYPE_MISMATCH: &str = "serializer.type_mismatch";
    /// 调用或构造时违反前置条件。
    pub const SERIALIZER_PRECONDITION: &str = "serializer.precondition";
    /// 自定义策略报告的内部失败。
    pub const SERIALIZER_STRATEGY: &str = "serializer.strategy";
    /// 转换器统一抛出的转换失败。
    pub const CONVERSION_FAILED: &str = "conversion.failed";
}

/// 错误的主要处置类别。
///
/// - `Io`：流层面或字节层面的问题，调用方通常应丢弃该流；
/// - `Precondition`：调用方传参或装配错误，重试不会改变结果；
/// - `Strategy`：自定义策略内部失败，语义由策略实现者定义。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCategory {
    /// I/O 类别，包含类型不可解析与负载损坏。
    Io,
    /// 前置条件类别。
    Precondition,
    /// 自定义策略类别。
    Strategy,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Io => "io",
            ErrorCategory::Precondition => "precondition",
            ErrorCategory::Strategy => "strategy",
        })
    }
}

/// 序列化策略层的错误域。
///
/// # 设计背景（Why）
/// - 策略契约只有一个失败出口，调用方却需要区分“流读不下去”“类型解析不到”“用错了 API”；
/// - 通过带标签的变体与 `source()` 错误链表达嵌套原因，而不是依赖运行时类型判断。
///
/// # 契约说明（What）
/// - `UnresolvedType` 属于 I/O 类别，但其 `source()` 一定是 [`UnresolvedTypeError`]，
///   调用方可借此区分“字节坏了”与“字节完好但当前上下文不认识该类型”；
/// - `NotSerializable`、`Precondition`、`TypeMismatch` 在违规调用处同步返回，绝不延迟；
/// - 策略与委托原样传播本错误，不做任何重试。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializationError {
    /// 底层流读写失败，包括流提前结束。
    #[error("I/O failure on serialization stream: {0}")]
    Io(#[from] io::Error),

    /// 编码类型无法在当前解析上下文中还原。
    #[error("Failed to deserialize object type")]
    UnresolvedType(#[source] UnresolvedTypeError),

    /// 字节序列不符合帧格式。
    #[error("malformed serialized stream: {reason}")]
    Malformed {
        /// 人类可读的原因描述。
        reason: Cow<'static, str>,
    },

    /// 帧中某个长度字段超过配置上限。
    #[error("{role} {field} length {len} exceeds configured limit {limit}")]
    LimitExceeded {
        /// 触发限制的一端。
        role: FrameRole,
        /// 超限字段名，例如 `type key`、`payload`。
        field: &'static str,
        /// 实际长度。
        len: usize,
        /// 配置上限。
        limit: usize,
    },

    /// 负载编解码失败。
    #[error("{role} failed to process payload for type key `{type_key}`")]
    Payload {
        /// 发生失败的一端。
        role: FrameRole,
        /// 对应的类型键。
        type_key: String,
        /// 负载编解码器给出的原因。
        #[source]
        source: bincode::Error,
    },

    /// 待编码对象的运行时类型不具备序列化能力。
    #[error("{strategy} requires a serializable payload but received an object of type [{type_name}]")]
    NotSerializable {
        /// 拒绝该对象的策略名。
        strategy: &'static str,
        /// 对象的运行时类型名。
        type_name: &'static str,
    },

    /// 解码出的对象与期望类型不符。
    #[error("expected decoded object of type `{expected}`, found `{actual}`")]
    TypeMismatch {
        /// 期望类型名。
        expected: &'static str,
        /// 实际类型名。
        actual: &'static str,
    },

    /// 违反构造期或调用期前置条件。
    #[error("{0}")]
    Precondition(Cow<'static, str>),

    /// 自定义策略报告的失败。
    #[error("serialization strategy failed: {message}")]
    Strategy {
        /// 失败描述。
        message: Cow<'static, str>,
        /// 可选的底层原因。
        #[source]
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },
}

impl SerializationError {
    /// 构造前置条件失败。
    pub fn precondition(message: impl Into<Cow<'static, str>>) -> Self {
        SerializationError::Precondition(message.into())
    }

    /// 构造帧格式错误。
    pub fn malformed(reason: impl Into<Cow<'static, str>>) -> Self {
        SerializationError::Malformed {
            reason: reason.into(),
        }
    }

    /// 供自定义策略报告失败。
    pub fn strategy(message: impl Into<Cow<'static, str>>) -> Self {
        SerializationError::Strategy {
            message: message.into(),
            source: None,
        }
    }

    /// 供自定义策略报告失败并附带底层原因。
    pub fn strategy_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        SerializationError::Strategy {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            SerializationError::Io(_) => codes::SERIALIZER_IO,
            SerializationError::UnresolvedType(_) => codes::SERIALIZER_UNRESOLVED_TYPE,
            SerializationError::Malformed { .. } => codes::SERIALIZER_MALFORMED,
            SerializationError::LimitExceeded { .. } => codes::SERIALIZER_LIMIT_EXCEEDED,
            SerializationError::Payload { .. } => codes::SERIALIZER_PAYLOAD,
            SerializationError::NotSerializable { .. } => codes::SERIALIZER_NOT_SERIALIZABLE,
            SerializationError::TypeMismatch { .. } => codes::SERIALIZER_TYPE_MISMATCH,
            SerializationError::Precondition(_) => codes::SERIALIZER_PRECONDITION,
            SerializationError::Strategy { .. } => codes::SERIALIZER_STRATEGY,
        }
    }

    /// 返回错误类别。
    ///
    /// # 契约说明（What）
    /// - 流读写、帧格式、长度超限、负载损坏与类型不可解析都归入 [`ErrorCategory::Io`]；
    /// - `NotSerializable`/`TypeMismatch`/`Precondition` 归入 [`ErrorCategory::Precondition`]；
    /// - `Strategy` 归入 [`ErrorCategory::Strategy`]。
    pub fn category(&self) -> ErrorCategory {
        match self {
            SerializationError::Io(_)
            | SerializationError::UnresolvedType(_)
            | SerializationError::Malformed { .. }
            | SerializationError::LimitExceeded { .. }
            | SerializationError::Payload { .. } => ErrorCategory::Io,
            SerializationError::NotSerializable { .. }
            | SerializationError::TypeMismatch { .. }
            | SerializationError::Precondition(_) => ErrorCategory::Precondition,
            SerializationError::Strategy { .. } => ErrorCategory::Strategy,
        }
    }

    /// 是否属于 I/O 类别。
    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }

    /// 若为类型不可解析错误，返回其原始解析失败。
    pub fn unresolved_type(&self) -> Option<&UnresolvedTypeError> {
        match self {
            SerializationError::UnresolvedType(inner) => Some(inner),
            _ => None,
        }
    }
}

/// 类型键在解析上下文中找不到对应绑定。
///
/// 作为 [`SerializationError::UnresolvedType`] 的 `source()` 出现。
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("type key `{type_key}` is not resolvable in resolution context `{context}`")]
pub struct UnresolvedTypeError {
    type_key: String,
    context: String,
}

impl UnresolvedTypeError {
    /// 构造解析失败。
    pub fn new(type_key: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            type_key: type_key.into(),
            context: context.into(),
        }
    }

    /// 流中记录的类型键。
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    /// 执行解析的上下文名称。
    pub fn context(&self) -> &str {
        &self.context
    }
}
