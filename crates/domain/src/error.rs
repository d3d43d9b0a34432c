//! # エラー定義
//!
//! 配信サブシステムのエラー分類（[`DeliveryErrorKind`]）と、
//! 個々の外部呼び出しが返すエラー（[`NotificationError`]）を定義する。
//!
//! ## 伝播方針
//!
//! | 種別 | 呼び出し元への扱い |
//! |------|------------------|
//! | `InvalidRequest` | 失敗として返す（プロバイダには一切触れない） |
//! | `NoProviderConfigured` | 失敗として返す（試行 0 回） |
//! | `AllProvidersExhausted` | 失敗として返す |
//! | `ProviderSendFailure` | 試行記録に吸収し、決定表に従ってフォールバック |
//! | `AttachmentGenerationFailed` | 警告に吸収し、添付なしで送信 |
//! | `HistoryPersistFailed` | 警告に吸収し、ログ出力のみ |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

/// 配信エラーの分類
///
/// レスポンスや送信結果ではバリアント名のまま（例: `"NoProviderConfigured"`）
/// シリアライズされる。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
pub enum DeliveryErrorKind {
    /// 必須フィールド（宛先・種別・データ）の欠落
    InvalidRequest,
    /// 利用可能なプロバイダが 1 つもない
    NoProviderConfigured,
    /// 単一の送信試行の失敗
    ProviderSendFailure,
    /// 適用可能なすべての試行が失敗
    AllProvidersExhausted,
    /// PDF 添付の生成に失敗
    AttachmentGenerationFailed,
    /// 送信履歴の永続化に失敗
    HistoryPersistFailed,
}

impl DeliveryErrorKind {
    /// 呼び出し元へ失敗として返す種別かどうか
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::InvalidRequest | Self::NoProviderConfigured | Self::AllProvidersExhausted
        )
    }
}

/// 通知処理のエラー
///
/// 送信・テンプレート・添付生成・履歴記録といった個々の処理が返す。
/// 呼び出し元への伝播可否は [`NotificationError::kind`] の分類で決まる。
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// 送信がタイムアウトした
    #[error("timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// 添付ファイルの生成に失敗
    #[error("添付ファイルの生成に失敗: {0}")]
    AttachmentFailed(String),

    /// 送信履歴の記録に失敗
    #[error("送信履歴の記録に失敗: {0}")]
    LogFailed(String),
}

impl NotificationError {
    /// エラー分類へ対応付ける
    ///
    /// テンプレート失敗は分類外（呼び出し元で内部エラーとして扱う）。
    pub fn kind(&self) -> Option<DeliveryErrorKind> {
        match self {
            Self::SendFailed(_) | Self::Timeout(_) => Some(DeliveryErrorKind::ProviderSendFailure),
            Self::AttachmentFailed(_) => Some(DeliveryErrorKind::AttachmentGenerationFailed),
            Self::LogFailed(_) => Some(DeliveryErrorKind::HistoryPersistFailed),
            Self::TemplateFailed(_) => None,
        }
    }
}
