//! 并发共享：同一策略实例可被多个线程同时调用，各线程只需持有自己的缓冲区。

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use spark_serializer::{
    Bytes, Converter, DefaultDeserializer, DefaultSerializer, Deserializer,
    DeserializingConverter, Object, SerializationDelegate, Serializer, SerializingConverter,
    TypeRegistry,
};

const WORKERS: u64 = 8;
const ROUNDS: u64 = 64;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Heartbeat {
    worker: u64,
    sequence: u64,
}

#[test]
fn shared_strategies_round_trip_across_threads() {
    let serializer = DefaultSerializer::new();
    let deserializer = DefaultDeserializer::new();
    let delegate = SerializationDelegate::default();
    let to_bytes = SerializingConverter::new();
    let from_bytes = DeserializingConverter::new();

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let (serializer, deserializer) = (&serializer, &deserializer);
            let (delegate, to_bytes, from_bytes) = (&delegate, &to_bytes, &from_bytes);
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let text = format!("worker-{worker}-round-{round}");
                    let mut buffer = Vec::new();
                    serializer.serialize(&text, &mut buffer).expect("编码");
                    let decoded = deserializer
                        .deserialize(&mut &buffer[..])
                        .expect("解码");
                    assert_eq!(decoded.downcast_ref::<String>(), Some(&text));

                    let number = worker * ROUNDS + round;
                    let bytes = delegate.serialize_to_bytes(&number).expect("委托编码");
                    let decoded = delegate.deserialize_from_slice(&bytes).expect("委托解码");
                    assert_eq!(decoded.downcast_ref::<u64>(), Some(&number));

                    let converted: Bytes = to_bytes.convert(&text).expect("转换");
                    let restored: Box<dyn Object> =
                        from_bytes.convert(&converted[..]).expect("逆转换");
                    assert_eq!(restored.downcast_ref::<String>(), Some(&text));
                }
            });
        }
    });
}

#[test]
fn registration_and_lookup_may_interleave() {
    let registry = Arc::new(TypeRegistry::with_builtins("shared"));
    let serializer = DefaultSerializer::with_resolver(registry.clone());
    let deserializer = DefaultDeserializer::with_resolver(registry.clone());

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let registry = &registry;
            let (serializer, deserializer) = (&serializer, &deserializer);
            scope.spawn(move || {
                registry
                    .register::<Heartbeat>("tests.heartbeat")
                    .expect("并发重复注册应幂等");
                for sequence in 0..ROUNDS {
                    let beat = Heartbeat { worker, sequence };
                    let bytes = serializer.serialize_to_bytes(&beat).expect("编码");
                    let decoded = deserializer.deserialize_from_slice(&bytes).expect("解码");
                    assert_eq!(decoded.downcast_ref::<Heartbeat>(), Some(&beat));
                }
            });
        }
    });

    assert_eq!(registry.len(), 17);
}
