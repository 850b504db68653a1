//! 默认编解码器往返性质。
//!
//! - **目标 (Why)**：任何被解析上下文接受的值，经 `DefaultSerializer` 编码、`DefaultDeserializer`
//!   解码后都应与原值结构相等；
//! - **手法 (How)**：对内置类型与一个自定义结构体生成随机输入，分别走字节便捷方法与
//!   `TypedDeserializer` 两条路径；
//! - **边界 (What)**：`f64` 只取有限值，NaN 不满足 `PartialEq` 自反性，不在本性质范围内。

use std::fmt::Debug;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use spark_serializer::{
    DefaultDeserializer, DefaultSerializer, Deserializer, Object, Serializer, TypedDeserializer,
    ambient,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    customer: String,
    lines: Vec<(String, u32)>,
    note: Option<String>,
}

fn register_order() {
    ambient()
        .register::<Order>("tests.order")
        .expect("注册幂等，重复调用必须成功");
}

fn round_trip<T>(value: &T) -> T
where
    T: Object + Clone + Debug + PartialEq,
{
    let bytes = DefaultSerializer::new()
        .serialize_to_bytes(value)
        .expect("编码");
    let object = DefaultDeserializer::new()
        .deserialize_from_slice(&bytes)
        .expect("解码");
    let typed: T = TypedDeserializer::<T>::default()
        .deserialize_from_slice(&bytes)
        .expect("按类型解码");
    assert_eq!(&typed, value);
    object
        .downcast::<T>()
        .map(|concrete| *concrete)
        .unwrap_or_else(|_| panic!("解码结果类型不符"))
}

#[test]
fn hello_round_trips() {
    let decoded = round_trip(&String::from("hello"));
    assert_eq!(decoded, "hello");
}

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        any::<u64>(),
        ".{0,24}",
        proptest::collection::vec((".{0,12}", any::<u32>()), 0..8),
        proptest::option::of(".{0,32}"),
    )
        .prop_map(|(id, customer, lines, note)| Order {
            id,
            customer,
            lines,
            note,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn strings_round_trip(value in any::<String>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn integers_round_trip(a in any::<i64>(), b in any::<u16>(), c in any::<i8>()) {
        prop_assert_eq!(round_trip(&a), a);
        prop_assert_eq!(round_trip(&b), b);
        prop_assert_eq!(round_trip(&c), c);
    }

    #[test]
    fn finite_floats_round_trip(value in -1.0e12_f64..1.0e12_f64) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn byte_and_string_lists_round_trip(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
        words in proptest::collection::vec(".{0,16}", 0..16),
    ) {
        prop_assert_eq!(round_trip(&bytes), bytes);
        prop_assert_eq!(round_trip(&words), words);
    }

    #[test]
    fn registered_structs_round_trip(order in order_strategy()) {
        register_order();
        prop_assert_eq!(round_trip(&order), order);
    }
}
