//! 默认编解码器的配置项。
//!
//! # 设计背景（Why）
//! - 帧中的长度字段来自不可信输入，解码端必须在分配内存之前核对上限，
//!   否则一个伪造的长度前缀就能触发巨量分配；
//! - 编码端使用同一组上限，保证“本端写得出、对端读得进”。
//!
//! # 契约说明（What）
//! - 配置在构造编解码器时注入，之后不可变；
//! - 支持从 TOML 表解析，缺省字段回落到默认值，未知字段直接报错。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 类型键长度默认上限（字节）。
pub const DEFAULT_MAX_TYPE_KEY_LEN: usize = 256;

/// 负载长度默认上限（字节）。
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// 默认编解码器的长度约束。
///
/// ```rust
/// use spark_serializer::CodecSettings;
///
/// let settings = CodecSettings::from_toml_str("max_payload_len = 4096").unwrap();
/// assert_eq!(settings.max_payload_len(), 4096);
/// assert_eq!(settings.max_type_key_len(), 256);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecSettings {
    max_type_key_len: usize,
    max_payload_len: usize,
}

impl CodecSettings {
    /// 使用自定义上限构造配置，并立即校验。
    pub fn new(max_type_key_len: usize, max_payload_len: usize) -> Result<Self, SettingsError> {
        let settings = Self {
            max_type_key_len,
            max_payload_len,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 从 TOML 文本解析配置。
    ///
    /// # 契约说明（What）
    /// - **输入**：一个 TOML 表，字段为 `max_type_key_len`、`max_payload_len`；
    /// - **后置条件**：返回的配置已通过 [`CodecSettings::validate`]。
    pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
        let settings: CodecSettings = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 类型键长度上限。
    pub fn max_type_key_len(&self) -> usize {
        self.max_type_key_len
    }

    /// 负载长度上限。
    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// 校验上限取值。
    ///
    /// 两个上限都必须非零，且不能超过帧中对应长度字段（`u16` / `u32`）的表示范围。
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_type_key_len == 0 || self.max_type_key_len > usize::from(u16::MAX) {
            return Err(SettingsError::Invalid {
                field: "max_type_key_len",
                reason: format!(
                    "must be within 1..={}, got {}",
                    u16::MAX,
                    self.max_type_key_len
                ),
            });
        }
        if self.max_payload_len == 0 || u32::try_from(self.max_payload_len).is_err() {
            return Err(SettingsError::Invalid {
                field: "max_payload_len",
                reason: format!(
                    "must be within 1..={}, got {}",
                    u32::MAX,
                    self.max_payload_len
                ),
            });
        }
        Ok(())
    }
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            max_type_key_len: DEFAULT_MAX_TYPE_KEY_LEN,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

/// 配置解析或校验失败。
#[derive(Debug, Error)]
pub enum SettingsError {
    /// TOML 语法或字段类型错误。
    #[error("failed to parse codec settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值非法。
    #[error("invalid codec setting `{field}`: {reason}")]
    Invalid {
        /// 字段名。
        field: &'static str,
        /// 原因。
        reason: String,
    },
}
