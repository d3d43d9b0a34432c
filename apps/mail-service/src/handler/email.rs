//! # メール送信ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/email/send` - トランザクションメールを 1 件送信
//!
//! ## リクエスト例
//!
//! ```json
//! {
//!   "type": "assessment_report",
//!   "recipientEmail": "student@example.com",
//!   "data": { "name": "张三", "assessmentId": "A-42" },
//!   "scheduleFollowUp": true
//! }
//! ```
//!
//! JSON として読めない本文も `InvalidRequest`（400）として扱うため、
//! `Json` 抽出の失敗はハンドラ内で変換する。

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use notifly_domain::{
    DeliveryErrorKind,
    notification::{DeliveryAttempt, ProviderRole},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::MailServiceError,
    usecase::{SendEmailInput, SendEmailOutcome, SendEmailService},
};

/// メール送信 API の共有状態
pub struct EmailState {
    pub service: SendEmailService,
}

/// メール送信リクエスト
///
/// 検証はユースケースで行うため、すべて省略可能として受け取る。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(rename = "type")]
    pub email_type:         Option<String>,
    pub recipient_email:    Option<String>,
    pub data:               Option<Value>,
    pub schedule_follow_up: Option<bool>,
}

impl From<SendEmailRequest> for SendEmailInput {
    fn from(req: SendEmailRequest) -> Self {
        Self {
            email_type:         req.email_type,
            recipient_email:    req.recipient_email,
            data:               req.data,
            schedule_follow_up: req.schedule_follow_up.unwrap_or(false),
        }
    }
}

/// メール送信レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success:             bool,
    /// 追跡 ID
    pub message_id:          String,
    pub service_used:        Option<ProviderRole>,
    pub attachments_dropped: bool,
    pub attempts:            Vec<DeliveryAttempt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings:            Vec<DeliveryErrorKind>,
}

impl From<SendEmailOutcome> for SendEmailResponse {
    fn from(outcome: SendEmailOutcome) -> Self {
        Self {
            success:             outcome.delivery.success,
            message_id:          outcome.tracking_id,
            service_used:        outcome.delivery.service_used,
            attachments_dropped: outcome.delivery.attachments_dropped,
            attempts:            outcome.delivery.attempts,
            warnings:            outcome.warnings,
        }
    }
}

/// POST /api/email/send
///
/// メールを送信し、追跡 ID と試行記録を返す。
pub async fn send_email(
    State(state): State<Arc<EmailState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, MailServiceError> {
    let Json(req) = payload.map_err(|e| MailServiceError::InvalidRequest(e.body_text()))?;

    let outcome = state.service.send(req.into()).await?;

    Ok(Json(outcome.into()))
}
