//! # 通知
//!
//! トランザクションメール配信に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`EmailMessage`] | 送信対象メール（本文 + 添付） |
//! | [`ProviderCapability`] | 送信プロバイダの能力スナップショット |
//! | [`DeliveryPlan`] | 決定表から導かれる送信戦略の順序付きリスト |
//! | [`DeliveryResult`] | 試行記録を含む最終的な送信結果 |
//! | [`EmailHistoryRecord`] | 送信履歴（追跡 ID をキーに記録） |
//!
//! ## 設計方針
//!
//! - **ルーティングは純粋関数**: 能力スナップショットを引数で受け取り、グローバル状態を参照しない
//! - **宣言的なフォールバック**: 送信順序は [`DeliveryStrategy`] のリストで表現し、実送信と分離する
//! - **試行記録が一次情報**: ログは [`DeliveryResult`] を観測して出力する

mod delivery;
mod email_type;
mod history;
mod message;
mod provider;

pub use delivery::{
    AttemptOutcome,
    DeliveryAttempt,
    DeliveryPlan,
    DeliveryResult,
    DeliveryStrategy,
    PlannedAttempt,
};
pub use email_type::EmailType;
pub use history::{EmailHistoryId, EmailHistoryRecord, SendStatus};
pub use message::{Attachment, EmailMessage};
pub use provider::{ProviderCapability, ProviderRole};
