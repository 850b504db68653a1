//! 序列化 / 反序列化策略契约。
//!
//! # 设计初衷（Why）
//! - 容器组件（缓存、会话、RPC 负载）需要一个可替换的“对象 ↔ 字节”策略，而不关心具体编码；
//! - 借鉴 `tokio-util::codec` 的 `Encoder`/`Decoder` 拆分，把两个方向拆成独立 trait，
//!   使得序列化与反序列化可以分别替换、自由组合（见 [`crate::SerializationDelegate`]）。
//!
//! # 契约说明（What）
//! - 策略只借用调用方提供的流，**绝不**关闭或持有它；流的生命周期由调用方负责；
//! - 字节数组便捷方法完全建立在流式原语之上，两者产出的字节逐位一致；
//! - 策略不持有逐次调用的可变状态，同一实例可被多线程并发使用，前提是每次调用各自的流不共享。

use std::any::type_name;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::SerializationError;

/// 字节数组便捷方法预分配的内存容量。
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// 将类型 `T` 的值编码写入输出流的策略。
///
/// # 契约说明（What）
/// - **输入**：`value` 为只读借用，策略不得修改源值；`sink` 由调用方拥有；
/// - **后置条件**：成功返回前必须刷新内部缓冲，使写出的字节对调用方立即可见；
/// - **错误**：写失败返回 [`SerializationError::Io`]，其余失败按 [`SerializationError`] 语义报告。
///
/// # 风险提示（Trade-offs）
/// - 流参数使用 `&mut dyn Write` 而非泛型，保证 trait 对象安全，可以装箱注入；
///   代价是每次写入多一次虚表跳转，对对象图序列化的整体成本可以忽略。
pub trait Serializer<T: ?Sized>: Send + Sync {
    /// 将 `value` 编码并写入 `sink`。
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError>;

    /// 将 `value` 编码为字节。
    ///
    /// 预分配 [`DEFAULT_BUFFER_CAPACITY`] 字节的内存输出流，委托给 [`Serializer::serialize`]，
    /// 返回累计的字节。失败路径上内存流随作用域释放。
    fn serialize_to_bytes(&self, value: &T) -> Result<Bytes, SerializationError> {
        let mut sink = BytesMut::with_capacity(DEFAULT_BUFFER_CAPACITY).writer();
        self.serialize(value, &mut sink)?;
        Ok(sink.into_inner().freeze())
    }

    /// 实现类型的简单名，用于诊断信息。
    fn strategy_name(&self) -> &'static str {
        simple_type_name(type_name::<Self>())
    }
}

/// 从输入流读取并还原类型 `T` 的值的策略。
///
/// # 契约说明（What）
/// - 只消费一个值所需的字节，不关闭 `source`，调用方可继续从同一流读取后续内容；
/// - 编码类型无法在当前解析上下文中还原时返回 [`SerializationError::UnresolvedType`]。
pub trait Deserializer<T>: Send + Sync {
    /// 从 `source` 读取一个值。
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError>;

    /// 从字节切片读取一个值。
    ///
    /// 将切片包装为只读内存流后委托给 [`Deserializer::deserialize`]，输入切片不会被修改。
    fn deserialize_from_slice(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        let mut source = bytes;
        self.deserialize(&mut source)
    }

    /// 实现类型的简单名，用于诊断信息。
    fn strategy_name(&self) -> &'static str {
        simple_type_name(type_name::<Self>())
    }
}

impl<T, S> Serializer<T> for &S
where
    T: ?Sized,
    S: Serializer<T> + ?Sized,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        (**self).serialize(value, sink)
    }

    fn serialize_to_bytes(&self, value: &T) -> Result<Bytes, SerializationError> {
        (**self).serialize_to_bytes(value)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

impl<T, S> Serializer<T> for Box<S>
where
    T: ?Sized,
    S: Serializer<T> + ?Sized,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        (**self).serialize(value, sink)
    }

    fn serialize_to_bytes(&self, value: &T) -> Result<Bytes, SerializationError> {
        (**self).serialize_to_bytes(value)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

impl<T, S> Serializer<T> for Arc<S>
where
    T: ?Sized,
    S: Serializer<T> + ?Sized,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        (**self).serialize(value, sink)
    }

    fn serialize_to_bytes(&self, value: &T) -> Result<Bytes, SerializationError> {
        (**self).serialize_to_bytes(value)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

impl<T, D> Deserializer<T> for &D
where
    D: Deserializer<T> + ?Sized,
{
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError> {
        (**self).deserialize(source)
    }

    fn deserialize_from_slice(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        (**self).deserialize_from_slice(bytes)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

impl<T, D> Deserializer<T> for Box<D>
where
    D: Deserializer<T> + ?Sized,
{
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError> {
        (**self).deserialize(source)
    }

    fn deserialize_from_slice(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        (**self).deserialize_from_slice(bytes)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

impl<T, D> Deserializer<T> for Arc<D>
where
    D: Deserializer<T> + ?Sized,
{
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError> {
        (**self).deserialize(source)
    }

    fn deserialize_from_slice(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        (**self).deserialize_from_slice(bytes)
    }

    fn strategy_name(&self) -> &'static str {
        (**self).strategy_name()
    }
}

/// 由闭包实现的序列化策略，见 [`serializer_fn`]。
pub struct FnSerializer<T: ?Sized, F> {
    f: F,
    _marker: PhantomData<fn(&T)>,
}

/// 以闭包构造序列化策略。
///
/// 闭包签名由 `T` 推导，调用时通常写作 `serializer_fn::<dyn Object, _>(|value, sink| ..)`。
pub fn serializer_fn<T, F>(f: F) -> FnSerializer<T, F>
where
    T: ?Sized,
    F: Fn(&T, &mut dyn Write) -> Result<(), SerializationError> + Send + Sync,
{
    FnSerializer {
        f,
        _marker: PhantomData,
    }
}

impl<T, F> Serializer<T> for FnSerializer<T, F>
where
    T: ?Sized,
    F: Fn(&T, &mut dyn Write) -> Result<(), SerializationError> + Send + Sync,
{
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<(), SerializationError> {
        (self.f)(value, sink)?;
        sink.flush()?;
        Ok(())
    }

    fn strategy_name(&self) -> &'static str {
        "FnSerializer"
    }
}

/// 由闭包实现的反序列化策略，见 [`deserializer_fn`]。
pub struct FnDeserializer<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

/// 以闭包构造反序列化策略。
pub fn deserializer_fn<T, F>(f: F) -> FnDeserializer<T, F>
where
    F: Fn(&mut dyn Read) -> Result<T, SerializationError> + Send + Sync,
{
    FnDeserializer {
        f,
        _marker: PhantomData,
    }
}

impl<T, F> Deserializer<T> for FnDeserializer<T, F>
where
    F: Fn(&mut dyn Read) -> Result<T, SerializationError> + Send + Sync,
{
    fn deserialize(&self, source: &mut dyn Read) -> Result<T, SerializationError> {
        (self.f)(source)
    }

    fn strategy_name(&self) -> &'static str {
        "FnDeserializer"
    }
}

/// 去掉模块路径与泛型参数后的类型简单名。
pub(crate) fn simple_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
