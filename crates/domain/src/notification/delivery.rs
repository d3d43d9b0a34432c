//! # 配信計画と送信結果
//!
//! プロバイダ能力スナップショットと添付の有無から、送信戦略の順序付きリスト
//! （[`DeliveryPlan`]）を決定表で導出する。実送信は行わない。
//!
//! ## 決定表（上から順に評価し、最初に一致した行を採用）
//!
//! | 添付 | Server | Secondary | 戦略 |
//! |------|--------|-----------|------|
//! | あり | 可 | 可 | `ServerWithAttachments` → `SecondaryWithoutAttachments` |
//! | あり | 可 | 不可 | `ServerWithAttachments` |
//! | あり | 不可 | 可 | `SecondaryWithoutAttachments` |
//! | なし | 可 | 可 | `SecondaryFirst` → `ServerAsBackup` |
//! | なし | 不可 | 可 | `SecondaryFirst` |
//! | なし | 可 | 不可 | `ServerOnly` |
//! | - | 不可 | 不可 | `NoProviderConfigured`（試行 0 回） |
//!
//! 1 回の送信で同じプロバイダを 2 度試すことはなく、試行は最大 2 回。
//! 添付経路で Server が失敗した場合、Server をバックアップとして再試行しない。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::provider::{ProviderCapability, ProviderRole};
use crate::error::DeliveryErrorKind;

/// 送信戦略
///
/// 決定表の各ステップに名前を付けたもの。
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
pub enum DeliveryStrategy {
    /// 添付付きで Server に送信する
    ServerWithAttachments,
    /// 添付を外して Secondary に送信する（添付経路の代替）
    SecondaryWithoutAttachments,
    /// 添付なしメールを Secondary に送信する（第一候補）
    SecondaryFirst,
    /// Secondary 失敗後に Server へ送信する
    ServerAsBackup,
    /// Server のみで送信する
    ServerOnly,
}

impl DeliveryStrategy {
    /// この戦略が使うプロバイダの役割
    pub fn role(self) -> ProviderRole {
        match self {
            Self::ServerWithAttachments | Self::ServerAsBackup | Self::ServerOnly => {
                ProviderRole::Server
            }
            Self::SecondaryWithoutAttachments | Self::SecondaryFirst => ProviderRole::Secondary,
        }
    }

    /// 添付ファイルを送信するかどうか
    pub fn carries_attachments(self) -> bool {
        matches!(self, Self::ServerWithAttachments)
    }

    /// バックアップとしての試行かどうか
    pub fn is_backup(self) -> bool {
        matches!(self, Self::ServerAsBackup)
    }
}

/// 計画された 1 回分の試行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAttempt {
    pub strategy: DeliveryStrategy,
    /// 使用するトランスポート名
    pub provider: String,
}

/// 配信計画
///
/// 空でない [`PlannedAttempt`] のリスト。先頭から順に試し、最初の成功で打ち切る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPlan {
    has_attachments: bool,
    attempts:        Vec<PlannedAttempt>,
}

impl DeliveryPlan {
    /// 決定表に従って配信計画を組み立てる
    ///
    /// Server 枠は「役割が Server・利用可能・添付対応」のプロバイダ、
    /// Secondary 枠は「役割が Secondary・利用可能」のプロバイダが埋める。
    /// どちらも埋まらない場合は `NoProviderConfigured` を返す。
    pub fn build(
        has_attachments: bool,
        capabilities: &[ProviderCapability],
    ) -> Result<Self, DeliveryErrorKind> {
        let server = capabilities.iter().find(|c| {
            c.role == ProviderRole::Server && c.is_available && c.supports_attachments
        });
        let secondary = capabilities
            .iter()
            .find(|c| c.role == ProviderRole::Secondary && c.is_available);

        let steps: Vec<(DeliveryStrategy, &ProviderCapability)> =
            match (has_attachments, server, secondary) {
                (true, Some(server), Some(secondary)) => vec![
                    (DeliveryStrategy::ServerWithAttachments, server),
                    (DeliveryStrategy::SecondaryWithoutAttachments, secondary),
                ],
                (true, Some(server), None) => {
                    vec![(DeliveryStrategy::ServerWithAttachments, server)]
                }
                (true, None, Some(secondary)) => {
                    vec![(DeliveryStrategy::SecondaryWithoutAttachments, secondary)]
                }
                (false, Some(server), Some(secondary)) => vec![
                    (DeliveryStrategy::SecondaryFirst, secondary),
                    (DeliveryStrategy::ServerAsBackup, server),
                ],
                (false, None, Some(secondary)) => {
                    vec![(DeliveryStrategy::SecondaryFirst, secondary)]
                }
                (false, Some(server), None) => vec![(DeliveryStrategy::ServerOnly, server)],
                (_, None, None) => return Err(DeliveryErrorKind::NoProviderConfigured),
            };

        let attempts = steps
            .into_iter()
            .map(|(strategy, capability)| PlannedAttempt {
                strategy,
                provider: capability.name.clone(),
            })
            .collect();

        Ok(Self {
            has_attachments,
            attempts,
        })
    }

    pub fn has_attachments(&self) -> bool {
        self.has_attachments
    }

    pub fn attempts(&self) -> &[PlannedAttempt] {
        &self.attempts
    }
}

/// 試行の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// 1 回の送信試行の記録（書き込みは一度きり）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAttempt {
    /// トランスポート名
    pub provider: String,
    pub strategy: DeliveryStrategy,
    pub outcome:  AttemptOutcome,
    /// 失敗理由などの短い説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail:   Option<String>,
}

impl DeliveryAttempt {
    pub fn succeeded(planned: &PlannedAttempt) -> Self {
        Self {
            provider: planned.provider.clone(),
            strategy: planned.strategy,
            outcome:  AttemptOutcome::Success,
            detail:   None,
        }
    }

    pub fn failed(planned: &PlannedAttempt, detail: impl Into<String>) -> Self {
        Self {
            provider: planned.provider.clone(),
            strategy: planned.strategy,
            outcome:  AttemptOutcome::Failure,
            detail:   Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// 最終的な送信結果
///
/// `attempts` は実際の呼び出し順をそのまま保持する。
/// 成功は「成功した試行がちょうど 1 つある」ことと同値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success:             bool,
    /// 成功したプロバイダの役割
    pub service_used:        Option<ProviderRole>,
    /// 添付なし経路のバックアップで成功したかどうか
    pub via_backup:          bool,
    /// 添付があったのに添付対応の試行が成功しなかったかどうか
    pub attachments_dropped: bool,
    pub attempts:            Vec<DeliveryAttempt>,
    pub error:               Option<DeliveryErrorKind>,
}

impl DeliveryResult {
    /// 利用可能なプロバイダがない場合の結果（試行 0 回）
    pub fn no_provider(has_attachments: bool) -> Self {
        Self {
            success:             false,
            service_used:        None,
            via_backup:          false,
            attachments_dropped: has_attachments,
            attempts:            Vec::new(),
            error:               Some(DeliveryErrorKind::NoProviderConfigured),
        }
    }

    /// 試行記録から結果を組み立てる
    pub fn from_attempts(has_attachments: bool, attempts: Vec<DeliveryAttempt>) -> Self {
        if attempts.is_empty() {
            return Self::no_provider(has_attachments);
        }

        let winner = attempts.iter().find(|a| a.is_success());
        debug_assert!(
            attempts.iter().filter(|a| a.is_success()).count() <= 1,
            "成功後に試行が続いている"
        );

        let attachments_delivered = winner.is_some_and(|a| a.strategy.carries_attachments());

        Self {
            success: winner.is_some(),
            service_used: winner.map(|a| a.strategy.role()),
            via_backup: winner.is_some_and(|a| a.strategy.is_backup()),
            attachments_dropped: has_attachments && !attachments_delivered,
            error: winner
                .is_none()
                .then_some(DeliveryErrorKind::AllProvidersExhausted),
            attempts,
        }
    }

    /// 成功した試行
    pub fn successful_attempt(&self) -> Option<&DeliveryAttempt> {
        self.attempts.iter().find(|a| a.is_success())
    }
}
