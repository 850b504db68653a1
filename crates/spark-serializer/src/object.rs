//! 运行时对象模型。
//!
//! 默认编解码器面向“任意对象”工作：调用方交给它的值在编译期可能只是 `&dyn Object`，
//! 真正的类型要到运行时才能确定。本模块提供最小的对象安全抽象，承载类型名、`Any`
//! 视图与下转型工具。

use std::any::{Any, TypeId};
use std::fmt;

/// 可被序列化策略观察的运行时对象。
///
/// # 设计初衷（Why）
/// - `dyn Any` 无法报告自身类型名，而默认序列化器拒绝对象时必须给出可读的类型名；
/// - 通过一揽子实现覆盖所有 `'static + Send + Sync` 类型，调用方无需手写任何实现。
///
/// # 契约说明（What）
/// - `type_name` 返回 [`std::any::type_name`] 的结果，仅用于诊断，不保证跨编译器稳定；
/// - `as_object` 把任意 `Object`（包括 `dyn Object` 本身）重新借用为 `&dyn Object`；
/// - **注意**：`Box<dyn Object>` 自身也满足一揽子实现，对其调用 trait 方法时请先解引用。
pub trait Object: Any + Send + Sync {
    /// 运行时类型名。
    fn type_name(&self) -> &'static str;

    /// 以 `&dyn Any` 形式访问。
    fn as_any(&self) -> &dyn Any;

    /// 转换为拥有所有权的 `Any`。
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// 重新借用为 `&dyn Object`。
    fn as_object(&self) -> &dyn Object;
}

impl<T> Object for T
where
    T: Any + Send + Sync,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn as_object(&self) -> &dyn Object {
        self
    }
}

impl dyn Object {
    /// 具体类型的 [`TypeId`]。
    pub fn concrete_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// 判断具体类型是否为 `T`。
    pub fn is<T: Any>(&self) -> bool {
        self.concrete_type_id() == TypeId::of::<T>()
    }

    /// 借用下转型。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// 拥有型下转型，失败时返回原对象的 `Any` 形式。
    pub fn downcast<T: Any>(self: Box<Self>) -> Result<Box<T>, Box<dyn Any + Send + Sync>> {
        self.into_any().downcast::<T>()
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.type_name()).finish()
    }
}

/// 剥离 `Box<dyn Object>` 包装，返回最内层对象。
///
/// 调用方常把解码结果原样再交给序列化器，此时实参是 `&Box<dyn Object>`，
/// 若不剥离，序列化器看到的将是 `Box` 本身的类型。
pub(crate) fn peel(object: &dyn Object) -> &dyn Object {
    match object.downcast_ref::<Box<dyn Object>>() {
        Some(inner) => peel(&**inner),
        None => object,
    }
}
