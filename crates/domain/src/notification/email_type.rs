//! メール種別

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// メール種別
///
/// 受信リクエストの `type` フィールド、送信履歴の `email_type` カラムに使われる。
/// snake_case でシリアライズされる。
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
pub enum EmailType {
    /// 測評レポート: 各次元のアドバイス・次のステップ・PDF 添付
    AssessmentReport,
    /// フォローアップ: 再測評の案内
    FollowUpReminder,
    /// ウェルカム: 登録直後の案内
    Welcome,
}

impl EmailType {
    /// 件名
    pub fn subject(self) -> &'static str {
        match self {
            Self::AssessmentReport => "您的测评报告已生成",
            Self::FollowUpReminder => "是时候回顾一下您的进步了",
            Self::Welcome => "欢迎加入",
        }
    }

    /// PDF 添付を要求するかどうか
    pub fn wants_pdf_attachment(self) -> bool {
        matches!(self, Self::AssessmentReport)
    }
}
