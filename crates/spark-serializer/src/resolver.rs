//! 类型解析上下文。
//!
//! # 设计背景（Why）
//! - 默认编解码器在帧中只记录一个稳定的“类型键”，解码端必须把它还原为可构造的具体类型；
//! - 不同模块、插件或租户可能各自持有一套可识别类型，因此解析上下文必须是显式注入的能力对象，
//!   而不是隐式的全局查找。
//!
//! # 行为逻辑（How）
//! - [`TypeBinding`] 把类型键、`TypeId` 与一对类型擦除后的负载编解码函数绑定在一起；
//! - [`TypeRegistry`] 以读写锁保护两张索引（键 → 绑定、`TypeId` → 绑定），并支持父级委派；
//! - [`ambient`] 返回进程级注册表，未显式指定解析上下文的策略都使用它。
//!
//! # 契约说明（What）
//! - 同一注册表内，一个键只对应一个类型，一个类型只对应一个键；
//! - 查找时本地绑定优先，未命中才委派父级；注册时拒绝与父级现有绑定冲突的键或类型；
//! - `resolve_type` 返回的绑定，其键经 `resolve_key` 必定解析回同一类型，
//!   父级稍后注册的同名键不会改变子注册表的解码结果。

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use bincode::Options;

use crate::error::SerializationError;
use crate::object::Object;
use crate::settings::DEFAULT_MAX_TYPE_KEY_LEN;

/// 进程级注册表的上下文名称。
pub const AMBIENT_CONTEXT: &str = "ambient";

type EncodeFn = fn(&dyn Object) -> bincode::Result<Vec<u8>>;
type DecodeFn = fn(&[u8]) -> bincode::Result<Box<dyn Object>>;

/// 把类型键映射为可构造类型的解析能力。
///
/// # 契约说明（What）
/// - `name` 仅用于诊断，出现在 [`UnresolvedTypeError`](crate::UnresolvedTypeError) 中；
/// - `resolve_key` 服务解码端，`resolve_type` 服务编码端；
/// - 实现必须线程安全，解析过程不得阻塞在外部 I/O 上。
pub trait TypeResolver: Send + Sync {
    /// 解析上下文名称。
    fn name(&self) -> &str;

    /// 按类型键查找绑定。
    fn resolve_key(&self, key: &str) -> Option<Arc<TypeBinding>>;

    /// 按具体类型查找绑定。
    fn resolve_type(&self, type_id: TypeId) -> Option<Arc<TypeBinding>>;
}

impl<R> TypeResolver for Arc<R>
where
    R: TypeResolver + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn resolve_key(&self, key: &str) -> Option<Arc<TypeBinding>> {
        (**self).resolve_key(key)
    }

    fn resolve_type(&self, type_id: TypeId) -> Option<Arc<TypeBinding>> {
        (**self).resolve_type(type_id)
    }
}

/// 一个类型键与具体类型之间的绑定。
///
/// 负载编码使用 `bincode` 驱动类型自身的 `serde` 实现；绑定只保存两个函数指针，
/// 因而可以零成本克隆并在线程间共享。
///
/// 解码必须恰好消费整段负载，残留字节视为损坏数据。
pub struct TypeBinding {
    key: String,
    type_id: TypeId,
    type_name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl TypeBinding {
    /// 为类型 `T` 构造绑定。
    pub fn of<T>(key: impl Into<String>) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            encode: encode_erased::<T>,
            decode: decode_erased::<T>,
        }
    }

    /// 写入帧中的类型键。
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 具体类型的 `TypeId`。
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 具体类型的 Rust 类型名。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 编码负载。`value` 的具体类型必须与绑定一致。
    pub fn encode(&self, value: &dyn Object) -> bincode::Result<Vec<u8>> {
        (self.encode)(value)
    }

    /// 解码负载。
    pub fn decode(&self, payload: &[u8]) -> bincode::Result<Box<dyn Object>> {
        (self.decode)(payload)
    }
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn encode_erased<T>(value: &dyn Object) -> bincode::Result<Vec<u8>>
where
    T: Serialize + 'static,
{
    match value.downcast_ref::<T>() {
        Some(concrete) => payload_options().serialize(concrete),
        None => Err(Box::new(bincode::ErrorKind::Custom(format!(
            "binding for `{}` cannot encode a value of type `{}`",
            type_name::<T>(),
            value.type_name()
        )))),
    }
}

fn decode_erased<T>(payload: &[u8]) -> bincode::Result<Box<dyn Object>>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value: T = payload_options().deserialize(payload)?;
    Ok(Box::new(value))
}

/// 定长整数、小端序，与 `bincode::serialize` 的字节布局一致，但拒绝残留字节。
fn payload_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

#[derive(Default)]
struct Bindings {
    by_key: HashMap<String, Arc<TypeBinding>>,
    by_type: HashMap<TypeId, Arc<TypeBinding>>,
}

impl Bindings {
    fn insert(&mut self, binding: TypeBinding) {
        let binding = Arc::new(binding);
        self.by_type.insert(binding.type_id, Arc::clone(&binding));
        self.by_key.insert(binding.key.clone(), binding);
    }

    fn builtins() -> Self {
        let mut bindings = Self::default();
        bindings.insert(TypeBinding::of::<()>("unit"));
        bindings.insert(TypeBinding::of::<bool>("bool"));
        bindings.insert(TypeBinding::of::<char>("char"));
        bindings.insert(TypeBinding::of::<i8>("i8"));
        bindings.insert(TypeBinding::of::<i16>("i16"));
        bindings.insert(TypeBinding::of::<i32>("i32"));
        bindings.insert(TypeBinding::of::<i64>("i64"));
        bindings.insert(TypeBinding::of::<u8>("u8"));
        bindings.insert(TypeBinding::of::<u16>("u16"));
        bindings.insert(TypeBinding::of::<u32>("u32"));
        bindings.insert(TypeBinding::of::<u64>("u64"));
        bindings.insert(TypeBinding::of::<f32>("f32"));
        bindings.insert(TypeBinding::of::<f64>("f64"));
        bindings.insert(TypeBinding::of::<String>("string"));
        bindings.insert(TypeBinding::of::<Vec<u8>>("bytes"));
        bindings.insert(TypeBinding::of::<Vec<String>>("string_list"));
        bindings
    }
}

/// 基于内存索引的类型注册表。
///
/// # 设计初衷（Why）
/// - 扮演“类加载器”角色：每个注册表是一个解析作用域，子作用域继承父作用域可见的全部类型；
/// - 允许运行期追加注册，以支持插件在启动后声明自己的负载类型。
///
/// # 行为逻辑（How）
/// - 读多写少，使用 `parking_lot::RwLock` 保护索引；
/// - 注册时同时检查本地与父级，拒绝与可见绑定冲突的键或类型；
/// - 查找本地优先：子注册表拥有的键与类型始终解析为自身绑定；
/// - 父级绑定的键若已被本地占用，该绑定对本注册表的编码端不可见，编码以
///   [`SerializationError::NotSerializable`] 失败，而不是写出会被解成其他类型的帧。
///
/// # 风险提示（Trade-offs）
/// - 注册表只追加不删除；删除绑定会让已写出的帧在同一进程内变得不可读。
pub struct TypeRegistry {
    name: String,
    parent: Option<Arc<dyn TypeResolver>>,
    bindings: RwLock<Bindings>,
}

impl TypeRegistry {
    /// 不含任何绑定的注册表。
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            bindings: RwLock::new(Bindings::default()),
        }
    }

    /// 预装标准库常用类型的注册表。
    ///
    /// | 类型键        | Rust 类型       |
    /// |---------------|-----------------|
    /// | `unit`        | `()`            |
    /// | `bool`/`char` | 同名            |
    /// | `i8`..`i64`   | 同名            |
    /// | `u8`..`u64`   | 同名            |
    /// | `f32`/`f64`   | 同名            |
    /// | `string`      | `String`        |
    /// | `bytes`       | `Vec<u8>`       |
    /// | `string_list` | `Vec<String>`   |
    pub fn with_builtins(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            bindings: RwLock::new(Bindings::builtins()),
        }
    }

    /// 以 `parent` 为父级的子注册表。
    pub fn child_of(name: impl Into<String>, parent: Arc<dyn TypeResolver>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            bindings: RwLock::new(Bindings::default()),
        }
    }

    /// 注册类型 `T`。
    ///
    /// # 契约说明（What）
    /// - **幂等**：同一键、同一类型重复注册（包括已在父级注册）直接成功；
    /// - **前置条件**：键非空且不超过 [`DEFAULT_MAX_TYPE_KEY_LEN`] 字节；键未绑定到其他类型；
    ///   类型未绑定到其他键；
    /// - 违反前置条件时返回 [`SerializationError::Precondition`]，注册表保持不变。
    pub fn register<T>(&self, key: impl Into<String>) -> Result<(), SerializationError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(SerializationError::precondition("type key must not be empty"));
        }
        if key.len() > DEFAULT_MAX_TYPE_KEY_LEN {
            return Err(SerializationError::precondition(format!(
                "type key length {} exceeds limit {DEFAULT_MAX_TYPE_KEY_LEN}",
                key.len()
            )));
        }
        let type_id = TypeId::of::<T>();

        if let Some(parent) = &self.parent {
            if let Some(existing) = parent.resolve_key(&key) {
                return check_same_type::<T>(&key, &existing);
            }
            if let Some(existing) = parent.resolve_type(type_id) {
                return Err(key_conflict::<T>(&key, &existing));
            }
        }

        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.by_key.get(&key) {
            return check_same_type::<T>(&key, existing);
        }
        if let Some(existing) = bindings.by_type.get(&type_id) {
            return Err(key_conflict::<T>(&key, existing));
        }
        debug!(
            registry = %self.name,
            type_key = %key,
            rust_type = type_name::<T>(),
            "registered serializable type"
        );
        bindings.insert(TypeBinding::of::<T>(key));
        Ok(())
    }

    /// 本注册表自身（不含父级）持有的绑定数量。
    pub fn len(&self) -> usize {
        self.bindings.read().by_key.len()
    }

    /// 本注册表自身是否没有任何绑定。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_same_type<T: 'static>(
    key: &str,
    existing: &TypeBinding,
) -> Result<(), SerializationError> {
    if existing.type_id == TypeId::of::<T>() {
        return Ok(());
    }
    Err(SerializationError::precondition(format!(
        "type key `{key}` is already bound to `{}`, cannot rebind it to `{}`",
        existing.type_name,
        type_name::<T>()
    )))
}

fn key_conflict<T: 'static>(key: &str, existing: &TypeBinding) -> SerializationError {
    SerializationError::precondition(format!(
        "type `{}` is already bound to key `{}`, cannot bind it to `{key}`",
        type_name::<T>(),
        existing.key
    ))
}

impl TypeResolver for TypeRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_key(&self, key: &str) -> Option<Arc<TypeBinding>> {
        if let Some(local) = self.bindings.read().by_key.get(key) {
            return Some(Arc::clone(local));
        }
        self.parent.as_ref()?.resolve_key(key)
    }

    fn resolve_type(&self, type_id: TypeId) -> Option<Arc<TypeBinding>> {
        let bindings = self.bindings.read();
        if let Some(local) = bindings.by_type.get(&type_id) {
            return Some(Arc::clone(local));
        }
        let inherited = self.parent.as_ref()?.resolve_type(type_id)?;
        // 键被本地占用时，按该键解码会得到本地类型。
        (!bindings.by_key.contains_key(inherited.key())).then_some(inherited)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("bindings", &self.len())
            .finish()
    }
}

static AMBIENT: LazyLock<Arc<TypeRegistry>> =
    LazyLock::new(|| Arc::new(TypeRegistry::with_builtins(AMBIENT_CONTEXT)));

/// 进程级注册表。
///
/// 预装 [`TypeRegistry::with_builtins`] 中的类型；应用可在启动阶段向其追加注册。
pub fn ambient() -> Arc<TypeRegistry> {
    Arc::clone(&AMBIENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use serde::Deserialize;
    use tracing_test::traced_test;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        id: u64,
        lines: Vec<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Receipt(u64);

    #[test]
    fn builtins_resolve_both_ways() {
        let registry = TypeRegistry::with_builtins("builtins");
        let binding = registry.resolve_key("string").expect("string 为内置类型");
        assert_eq!(binding.type_id(), TypeId::of::<String>());
        assert_eq!(
            registry
                .resolve_type(TypeId::of::<Vec<u8>>())
                .map(|binding| binding.key().to_owned()),
            Some("bytes".to_owned())
        );
        assert!(TypeRegistry::empty("bare").resolve_key("string").is_none());
    }

    #[test]
    fn binding_round_trips_payload() {
        let binding = TypeBinding::of::<Invoice>("billing.invoice");
        let invoice = Invoice {
            id: 7,
            lines: vec!["coffee".into()],
        };

        let payload = binding.encode(&invoice).expect("编码");
        let decoded = binding.decode(&payload).expect("解码");
        assert_eq!(decoded.downcast_ref::<Invoice>(), Some(&invoice));

        let err = binding.encode(&Receipt(1)).expect_err("类型不一致必须失败");
        assert!(err.to_string().contains("cannot encode"));
    }

    #[traced_test]
    #[test]
    fn register_is_idempotent_and_logged() {
        let registry = TypeRegistry::empty("billing");
        registry.register::<Invoice>("billing.invoice").expect("首次注册");
        registry.register::<Invoice>("billing.invoice").expect("重复注册应幂等");
        assert_eq!(registry.len(), 1);
        assert!(logs_contain("registered serializable type"));
    }

    #[test]
    fn conflicting_registrations_are_rejected() {
        let registry = TypeRegistry::empty("billing");
        registry.register::<Invoice>("billing.invoice").expect("首次注册");

        let err = registry
            .register::<Receipt>("billing.invoice")
            .expect_err("键已被占用");
        assert_eq!(err.code(), codes::SERIALIZER_PRECONDITION);

        let err = registry
            .register::<Invoice>("billing.other")
            .expect_err("类型已绑定其他键");
        assert!(err.to_string().contains("billing.invoice"));

        let err = registry.register::<Receipt>("").expect_err("空键非法");
        assert_eq!(err.to_string(), "type key must not be empty");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn overlong_keys_are_rejected_at_registration() {
        let registry = TypeRegistry::empty("billing");
        let err = registry
            .register::<Receipt>("k".repeat(DEFAULT_MAX_TYPE_KEY_LEN + 1))
            .expect_err("超长键非法");
        assert_eq!(err.code(), codes::SERIALIZER_PRECONDITION);
        assert_eq!(err.to_string(), "type key length 257 exceeds limit 256");
        assert!(registry.is_empty());

        registry
            .register::<Receipt>("k".repeat(DEFAULT_MAX_TYPE_KEY_LEN))
            .expect("恰好等于上限的键合法");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn trailing_payload_bytes_are_rejected() {
        let binding = TypeBinding::of::<u8>("u8");
        assert_eq!(
            binding.decode(&[5]).expect("完整负载").downcast_ref::<u8>(),
            Some(&5)
        );
        assert!(binding.decode(&[5, 0xDE, 0xAD, 0xBE, 0xEF]).is_err());
    }

    #[test]
    fn payload_layout_matches_plain_bincode() {
        let invoice = Invoice {
            id: 300,
            lines: vec!["tea".into()],
        };
        let payload = TypeBinding::of::<Invoice>("billing.invoice")
            .encode(&invoice)
            .expect("编码");
        assert_eq!(payload, bincode::serialize(&invoice).expect("参照编码"));
    }

    #[test]
    fn child_falls_back_to_parent() {
        let parent = Arc::new(TypeRegistry::with_builtins("host"));
        let child = TypeRegistry::child_of("plugin", parent.clone());
        child.register::<Invoice>("billing.invoice").expect("子级注册");

        assert!(child.resolve_key("u32").is_some());
        assert!(child.resolve_key("billing.invoice").is_some());
        assert!(parent.resolve_key("billing.invoice").is_none());

        child.register::<String>("string").expect("父级已有相同绑定，幂等成功");
        assert!(child.register::<Receipt>("string").is_err());
        assert!(child.register::<u32>("plugin.u32").is_err());
        assert_eq!(child.len(), 1);
    }

    #[test]
    fn late_parent_registration_does_not_shadow_child() {
        let parent = Arc::new(TypeRegistry::empty("host"));
        let child = TypeRegistry::child_of("plugin", parent.clone());
        child.register::<Invoice>("shared.key").expect("子级先注册");
        parent
            .register::<Receipt>("shared.key")
            .expect("父级看不到子级绑定，注册成功");

        let by_key = child.resolve_key("shared.key").expect("键可解析");
        assert_eq!(by_key.type_id(), TypeId::of::<Invoice>());
        let by_type = child
            .resolve_type(TypeId::of::<Invoice>())
            .expect("子级类型可解析");
        assert_eq!(by_type.key(), "shared.key");

        let invoice = Invoice {
            id: 300,
            lines: vec!["x".into()],
        };
        let payload = by_type.encode(&invoice).expect("编码");
        let decoded = child
            .resolve_key(by_type.key())
            .expect("键可解析")
            .decode(&payload)
            .expect("解码");
        assert_eq!(decoded.downcast_ref::<Invoice>(), Some(&invoice));

        // 父级绑定的键被子级占用，子级不得写出会被解成 Invoice 的 Receipt 帧。
        assert!(child.resolve_type(TypeId::of::<Receipt>()).is_none());
        assert_eq!(
            parent
                .resolve_key("shared.key")
                .map(|binding| binding.type_id()),
            Some(TypeId::of::<Receipt>())
        );
    }

    #[test]
    fn ambient_registry_is_shared() {
        assert!(Arc::ptr_eq(&ambient(), &ambient()));
        assert_eq!(ambient().name(), AMBIENT_CONTEXT);
    }
}
