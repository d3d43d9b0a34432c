//! 送信履歴

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::email_type::EmailType;

define_uuid_id! {
    /// 送信履歴 ID
    ///
    /// email_history テーブルの主キー。UUID v7 を使用。
    pub struct EmailHistoryId;
}

/// 送信ステータス
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SendStatus {
    Sent,
    Failed,
    /// フォローアップの送信予約
    Scheduled,
}

/// 送信履歴レコード
///
/// 送信結果ごとに一度だけ書き込まれる。追跡 ID で開封・クリック記録と突き合わせる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailHistoryRecord {
    pub id:                EmailHistoryId,
    pub recipient:         String,
    pub email_type:        EmailType,
    pub subject:           String,
    pub sent_at:           DateTime<Utc>,
    pub status:            SendStatus,
    pub tracking_id:       String,
    /// 関連エンティティ（測評 ID など）
    pub related_entity_id: Option<String>,
    /// 成功したトランスポート名
    pub service_used:      Option<String>,
    pub error_message:     Option<String>,
    /// `Scheduled` の場合の送信予定時刻
    pub scheduled_for:     Option<DateTime<Utc>>,
}
