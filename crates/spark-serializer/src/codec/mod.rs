//! 默认编解码器。
//!
//! # 模块定位（Why）
//! - 提供开箱即用的策略对：[`DefaultSerializer`] 与 [`DefaultDeserializer`]；
//! - 帧格式集中在 [`frame`] 子模块，策略本身只负责类型解析与负载编解码。
//!
//! # 使用方式（How）
//! - 未指定解析上下文时使用 [`ambient`](crate::resolver::ambient)；
//! - 插件或多租户场景下，通过 `with_resolver` 为编码端与解码端注入各自的上下文；
//! - 需要具体类型时，用 [`TypedDeserializer`] 包装对象层反序列化器。

mod default;
pub mod frame;
mod typed;

pub use default::{DefaultDeserializer, DefaultSerializer};
pub use frame::FrameRole;
pub use typed::TypedDeserializer;
