//! # 通知送信
//!
//! メールを実際に送るトランスポートと、起動時に確定するプロバイダの組を扱う。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でトランスポートを抽象化
//! - **3 つの実装**: SMTP（添付対応）、SES（添付非対応）、Noop（ローカル実行用）
//! - **能力は自己申告**: 各実装が `name()` と `supports_attachments()` を返し、
//!   [`ProviderRegistry`] がそれを能力スナップショットにまとめる

mod noop;
mod registry;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use notifly_domain::{NotificationError, notification::EmailMessage};
pub use registry::ProviderRegistry;
pub use ses::SesNotificationSender;
pub use smtp::{SmtpCredentials, SmtpNotificationSender};

/// メール送信トレイト
///
/// 1 回の呼び出しが 1 回の送信試行に対応する。リトライはしない
/// （フォールバックは呼び出し側の配信計画が決める）。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// トランスポート名（送信試行の記録に使う）
    fn name(&self) -> &'static str;

    /// 添付ファイルを送れるかどうか
    fn supports_attachments(&self) -> bool;

    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
