//! プロバイダ能力

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// 送信プロバイダの役割
///
/// - `Server`: 添付対応（SMTP 系）
/// - `Secondary`: 添付非対応（API 系）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderRole {
    Server,
    Secondary,
}

/// プロバイダの能力スナップショット
///
/// プロセス起動時に設定の有無から一度だけ算出され、送信中は読み取り専用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapability {
    /// トランスポート名（例: `smtp`, `ses`）
    pub name:                 String,
    pub role:                 ProviderRole,
    pub supports_attachments: bool,
    pub is_available:         bool,
}

impl ProviderCapability {
    pub fn new(
        name: impl Into<String>,
        role: ProviderRole,
        supports_attachments: bool,
        is_available: bool,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            supports_attachments,
            is_available,
        }
    }
}
