//! 默认编解码器的帧格式。
//!
//! # 设计背景（Why）
//! - 解码端需要在读取负载前知道“是什么类型”和“有多长”，才能先做解析与限额检查、
//!   再分配内存；
//! - 每个对象自成一帧且长度自描述，解码时绝不越过帧尾读取，调用方可以在同一条流上
//!   连续写入多个对象。
//!
//! # 帧布局（What）
//! 全部整数按网络字节序（大端）编码：
//!
//! | 偏移    | 长度 | 字段                          |
//! |---------|------|-------------------------------|
//! | 0       | 4    | 魔数 `SPKS`                   |
//! | 4       | 1    | 格式版本，当前为 `1`          |
//! | 5       | 2    | 类型键长度 `k`（`u16`）       |
//! | 7       | k    | 类型键（UTF-8，非空）         |
//! | 7+k     | 4    | 负载长度 `n`（`u32`）         |
//! | 11+k    | n    | 负载（`bincode` 编码）        |

use std::fmt;
use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::SerializationError;
use crate::settings::CodecSettings;

/// 帧魔数。
pub const MAGIC: [u8; 4] = *b"SPKS";

/// 当前帧格式版本。
pub const FORMAT_VERSION: u8 = 1;

/// 魔数、版本与类型键长度字段的总长度。
const PREFIX_LEN: usize = 7;

/// 负载长度字段的长度。
const PAYLOAD_LEN_FIELD: usize = 4;

/// 区分限额检查发生在编码端还是解码端，用于错误消息与日志字段。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FrameRole {
    /// 编码端。
    Encoder,
    /// 解码端。
    Decoder,
}

impl FrameRole {
    /// 角色标签。
    pub fn label(self) -> &'static str {
        match self {
            FrameRole::Encoder => "encoder",
            FrameRole::Decoder => "decoder",
        }
    }
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 从流中读出的一帧。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawFrame {
    type_key: String,
    payload: Vec<u8>,
}

impl RawFrame {
    /// 类型键。
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    /// 负载字节。
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// 写出一帧。
///
/// # 契约说明（What）
/// - **前置条件**：`type_key` 非空；
/// - **后置条件**：成功时整帧已交给 `sink`，本函数不负责刷新；
/// - 超出 `settings` 限额时返回 [`SerializationError::LimitExceeded`]，此时不写出任何字节。
pub fn write_frame(
    sink: &mut dyn Write,
    type_key: &str,
    payload: &[u8],
    settings: &CodecSettings,
) -> Result<(), SerializationError> {
    if type_key.is_empty() {
        return Err(SerializationError::precondition("type key must not be empty"));
    }
    let key_len = checked_len::<u16>(
        FrameRole::Encoder,
        "type key",
        type_key.len(),
        settings.max_type_key_len(),
    )?;
    let payload_len = checked_len::<u32>(
        FrameRole::Encoder,
        "payload",
        payload.len(),
        settings.max_payload_len(),
    )?;

    let mut frame =
        BytesMut::with_capacity(PREFIX_LEN + type_key.len() + PAYLOAD_LEN_FIELD + payload.len());
    frame.put_slice(&MAGIC);
    frame.put_u8(FORMAT_VERSION);
    frame.put_u16(key_len);
    frame.put_slice(type_key.as_bytes());
    frame.put_u32(payload_len);
    frame.put_slice(payload);
    sink.write_all(&frame)?;

    trace!(
        type_key,
        payload_len = payload.len(),
        frame_len = frame.len(),
        "wrote serialization frame"
    );
    Ok(())
}

/// 读取一帧。
///
/// # 契约说明（What）
/// - 只读取本帧覆盖的字节，绝不越过帧尾；
/// - 流提前结束返回 [`SerializationError::Io`]（`UnexpectedEof`）；
/// - 魔数、版本或类型键编码不合法返回 [`SerializationError::Malformed`]；
/// - 长度字段超出 `settings` 限额时，在分配内存之前返回 [`SerializationError::LimitExceeded`]。
pub fn read_frame(
    source: &mut dyn Read,
    settings: &CodecSettings,
) -> Result<RawFrame, SerializationError> {
    let mut prefix = [0u8; PREFIX_LEN];
    source.read_exact(&mut prefix)?;
    let mut cursor = &prefix[..];

    let mut magic = [0u8; 4];
    cursor.copy_to_slice(&mut magic);
    if magic != MAGIC {
        return Err(SerializationError::malformed(format!(
            "invalid stream header {magic:02x?}"
        )));
    }
    let version = cursor.get_u8();
    if version != FORMAT_VERSION {
        return Err(SerializationError::malformed(format!(
            "unsupported format version {version}"
        )));
    }
    let key_len = usize::from(cursor.get_u16());
    if key_len == 0 {
        return Err(SerializationError::malformed("empty type key"));
    }
    check_limit(
        FrameRole::Decoder,
        "type key",
        key_len,
        settings.max_type_key_len(),
    )?;

    let mut key = vec![0u8; key_len];
    source.read_exact(&mut key)?;
    let type_key = String::from_utf8(key)
        .map_err(|_| SerializationError::malformed("type key is not valid UTF-8"))?;

    let mut len_field = [0u8; PAYLOAD_LEN_FIELD];
    source.read_exact(&mut len_field)?;
    let payload_len = usize::try_from(u32::from_be_bytes(len_field)).map_err(|_| {
        SerializationError::LimitExceeded {
            role: FrameRole::Decoder,
            field: "payload",
            len: usize::MAX,
            limit: settings.max_payload_len(),
        }
    })?;
    check_limit(
        FrameRole::Decoder,
        "payload",
        payload_len,
        settings.max_payload_len(),
    )?;

    let mut payload = vec![0u8; payload_len];
    source.read_exact(&mut payload)?;

    trace!(type_key = %type_key, payload_len, "read serialization frame");
    Ok(RawFrame { type_key, payload })
}

fn check_limit(
    role: FrameRole,
    field: &'static str,
    len: usize,
    limit: usize,
) -> Result<(), SerializationError> {
    if len > limit {
        return Err(SerializationError::LimitExceeded {
            role,
            field,
            len,
            limit,
        });
    }
    Ok(())
}

fn checked_len<N>(
    role: FrameRole,
    field: &'static str,
    len: usize,
    limit: usize,
) -> Result<N, SerializationError>
where
    N: TryFrom<usize>,
{
    check_limit(role, field, len, limit)?;
    N::try_from(len).map_err(|_| SerializationError::LimitExceeded {
        role,
        field,
        len,
        limit,
    })
}
