//! # 配信オーケストレーター
//!
//! 能力スナップショットから [`DeliveryPlan`] を導き、計画どおりに送信を試みる。
//!
//! - 試行は逐次。最初の成功で打ち切る
//! - 各試行は `tokio::time::timeout` で上限を設け、超過は送信失敗として記録する
//! - 添付を運ばない戦略には添付を外したメッセージを渡す
//!
//! ログ出力は結果の組み立てから切り離し、[`log_delivery`] が
//! [`DeliveryResult`] を観測して行う。

use std::{borrow::Cow, sync::Arc, time::Duration};

use notifly_domain::{
    NotificationError,
    notification::{DeliveryAttempt, DeliveryPlan, DeliveryResult, EmailMessage, PlannedAttempt},
};
use notifly_infra::notification::ProviderRegistry;
use notifly_shared::{
    event_log::{error, event},
    log_business_event,
};

/// 配信オーケストレーター
pub struct DeliveryOrchestrator {
    registry:        Arc<ProviderRegistry>,
    attempt_timeout: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, attempt_timeout: Duration) -> Self {
        Self {
            registry,
            attempt_timeout,
        }
    }

    /// メッセージを配信する
    ///
    /// 失敗も含めて常に [`DeliveryResult`] を返す。
    pub async fn deliver(&self, message: &EmailMessage) -> DeliveryResult {
        let has_attachments = message.has_attachments();

        let Ok(plan) = DeliveryPlan::build(has_attachments, self.registry.get_available()) else {
            return DeliveryResult::no_provider(has_attachments);
        };

        let mut attempts = Vec::with_capacity(plan.attempts().len());
        for planned in plan.attempts() {
            let attempt = self.attempt(planned, message).await;
            let succeeded = attempt.is_success();
            attempts.push(attempt);
            if succeeded {
                break;
            }
        }

        DeliveryResult::from_attempts(has_attachments, attempts)
    }

    async fn attempt(&self, planned: &PlannedAttempt, message: &EmailMessage) -> DeliveryAttempt {
        let Some(sender) = self.registry.sender(planned.strategy.role()) else {
            return DeliveryAttempt::failed(planned, "provider not configured");
        };

        let outgoing = if message.has_attachments() && !planned.strategy.carries_attachments() {
            Cow::Owned(message.without_attachments())
        } else {
            Cow::Borrowed(message)
        };

        match tokio::time::timeout(self.attempt_timeout, sender.send_email(&outgoing)).await {
            Ok(Ok(())) => DeliveryAttempt::succeeded(planned),
            Ok(Err(e)) => DeliveryAttempt::failed(planned, e.to_string()),
            Err(_) => DeliveryAttempt::failed(
                planned,
                NotificationError::Timeout(self.attempt_timeout).to_string(),
            ),
        }
    }
}

/// 送信結果をログに出力する
///
/// 試行ごとに 1 行、全体の結果を 1 行出す。
pub fn log_delivery(result: &DeliveryResult, tracking_id: &str) {
    for (index, attempt) in result.attempts.iter().enumerate() {
        let strategy: &'static str = attempt.strategy.into();
        if attempt.is_success() {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::ATTEMPT_SUCCEEDED,
                event.entity_type = event::entity_type::EMAIL,
                event.entity_id = tracking_id,
                event.result = event::result::SUCCESS,
                delivery.provider = %attempt.provider,
                delivery.strategy = strategy,
                delivery.attempt = index + 1,
                "送信試行成功"
            );
        } else {
            tracing::warn!(
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::PROVIDER_SEND,
                event.action = event::action::ATTEMPT_FAILED,
                event.entity_id = tracking_id,
                delivery.provider = %attempt.provider,
                delivery.strategy = strategy,
                delivery.attempt = index + 1,
                detail = attempt.detail.as_deref().unwrap_or_default(),
                "送信試行失敗"
            );
        }
    }

    if result.success {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::EMAIL_SENT,
            event.entity_type = event::entity_type::EMAIL,
            event.entity_id = tracking_id,
            event.result = event::result::SUCCESS,
            delivery.service_used = ?result.service_used,
            delivery.via_backup = result.via_backup,
            delivery.attachments_dropped = result.attachments_dropped,
            delivery.attempts = result.attempts.len(),
            "メール送信成功"
        );
    } else {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::EMAIL_FAILED,
            event.entity_type = event::entity_type::EMAIL,
            event.entity_id = tracking_id,
            event.result = event::result::FAILURE,
            delivery.error = ?result.error,
            delivery.attempts = result.attempts.len(),
            "メール送信失敗"
        );
    }
}
