//! # メール送信サービス
//!
//! 1 件の送信リクエストを検証から履歴記録まで通しで処理する。
//!
//! ```text
//! 検証 → 追跡トークン発行 → PDF 生成 → レンダリング → 配信 → 履歴記録 → フォローアップ予約
//! ```
//!
//! ## 設計方針
//!
//! - **呼び出し元に返す失敗は 3 種類だけ**: `InvalidRequest` / `NoProviderConfigured` /
//!   `AllProvidersExhausted`（加えてテンプレート不備の内部エラー）
//! - **副作用の失敗は警告**: PDF 生成・履歴記録の失敗はログに残し、
//!   [`SendEmailOutcome::warnings`] に積んで処理を続ける
//! - **履歴記録は時間で打ち切る**: 配信済みのレスポンスを DB の停滞で止めない
//! - **依存性注入**: 送信・履歴・添付生成はすべて trait で抽象化

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use notifly_domain::{
    DeliveryErrorKind,
    NotificationError,
    clock::Clock,
    notification::{
        Attachment,
        DeliveryResult,
        EmailHistoryId,
        EmailHistoryRecord,
        EmailMessage,
        EmailType,
        SendStatus,
    },
    tracking::{TrackingTokenService, TrackingUrls},
};
use notifly_infra::{
    attachment::{AttachmentGenerator, pdf_attachment},
    repository::EmailHistoryRepository,
};
use notifly_shared::{
    event_log::{error, event},
    log_business_event,
};
use serde_json::{Map, Value};
use validator::ValidateEmail;

use super::{
    DeliveryOrchestrator,
    RenderRequest,
    TemplateRenderer,
    delivery::log_delivery,
    template_renderer::data_text,
};
use crate::error::MailServiceError;

/// 送信履歴 1 件の書き込み待ち上限
const HISTORY_WRITE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// 送信リクエスト（検証前）
#[derive(Debug, Clone, Default)]
pub struct SendEmailInput {
    pub email_type:         Option<String>,
    pub recipient_email:    Option<String>,
    pub data:               Option<Value>,
    pub schedule_follow_up: bool,
}

/// 送信成功時の結果
#[derive(Debug, Clone)]
pub struct SendEmailOutcome {
    /// 追跡 ID（レスポンスの `messageId`）
    pub tracking_id: String,
    pub delivery:    DeliveryResult,
    /// 吸収した非致命的な失敗
    pub warnings:    Vec<DeliveryErrorKind>,
}

/// 送信サービスの設定値
#[derive(Debug, Clone)]
pub struct SendEmailSettings {
    pub base_url:             String,
    pub follow_up_delay_days: u32,
}

/// 検証済みのリクエスト
struct ValidatedRequest {
    email_type:         EmailType,
    recipient:          String,
    data:               Map<String, Value>,
    schedule_follow_up: bool,
}

/// メール送信サービス
pub struct SendEmailService {
    orchestrator: DeliveryOrchestrator,
    renderer:     TemplateRenderer,
    tokens:       TrackingTokenService,
    history:      Arc<dyn EmailHistoryRepository>,
    attachments:  Option<Arc<dyn AttachmentGenerator>>,
    clock:        Arc<dyn Clock>,
    settings:     SendEmailSettings,
}

impl SendEmailService {
    pub fn new(
        orchestrator: DeliveryOrchestrator,
        renderer: TemplateRenderer,
        history: Arc<dyn EmailHistoryRepository>,
        attachments: Option<Arc<dyn AttachmentGenerator>>,
        clock: Arc<dyn Clock>,
        settings: SendEmailSettings,
    ) -> Self {
        Self {
            orchestrator,
            renderer,
            tokens: TrackingTokenService::new(clock.clone()),
            history,
            attachments,
            clock,
            settings,
        }
    }

    /// メールを 1 件送信する
    #[tracing::instrument(skip_all, fields(email_type = input.email_type.as_deref()))]
    pub async fn send(&self, input: SendEmailInput) -> Result<SendEmailOutcome, MailServiceError> {
        let request = validate(input).inspect_err(|e| {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::EMAIL_REJECTED,
                event.entity_type = event::entity_type::EMAIL,
                event.result = event::result::FAILURE,
                reason = %e,
                "送信リクエストを拒否"
            );
        })?;

        let token = self.tokens.mint();
        let tracking_id = token.id().to_string();
        let tracking = TrackingUrls::new(token, self.settings.base_url.as_str());
        let mut warnings = Vec::new();

        let attachments = self.generate_attachments(&request, &mut warnings).await;

        let message = self
            .renderer
            .render(RenderRequest {
                email_type: request.email_type,
                recipient: &request.recipient,
                data: &request.data,
                tracking: &tracking,
                attachments,
            })
            .map_err(|e| {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::TEMPLATE,
                    error = %e,
                    "メールテンプレートのレンダリングに失敗"
                );
                MailServiceError::Internal(e.to_string())
            })?;

        let delivery = self.orchestrator.deliver(&message).await;
        log_delivery(&delivery, &tracking_id);

        let now = self.clock.now();
        let record = history_record(&request, &message, &delivery, &tracking_id, now);
        self.record_history(&record, &mut warnings).await;

        if delivery.success && request.schedule_follow_up {
            self.schedule_follow_up(&request, &tracking_id, now, &mut warnings)
                .await;
        }

        match delivery.error {
            None => Ok(SendEmailOutcome {
                tracking_id,
                delivery,
                warnings,
            }),
            Some(DeliveryErrorKind::NoProviderConfigured) => {
                Err(MailServiceError::NoProviderConfigured)
            }
            Some(_) => Err(MailServiceError::AllProvidersExhausted {
                attempts: delivery.attempts,
            }),
        }
    }

    /// PDF 添付を生成する（失敗は警告に吸収）
    async fn generate_attachments(
        &self,
        request: &ValidatedRequest,
        warnings: &mut Vec<DeliveryErrorKind>,
    ) -> Vec<Attachment> {
        if !request.email_type.wants_pdf_attachment() {
            return Vec::new();
        }
        let Some(generator) = &self.attachments else {
            return Vec::new();
        };

        match generator.generate(&Value::Object(request.data.clone())).await {
            Ok(content) => vec![pdf_attachment(content)],
            Err(e) => {
                let err = NotificationError::AttachmentFailed(e.to_string());
                tracing::warn!(
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::ATTACHMENT_GENERATION,
                    error = %err,
                    "PDF の生成に失敗。添付なしで送信する"
                );
                warnings.extend(err.kind());
                Vec::new()
            }
        }
    }

    async fn record_history(
        &self,
        record: &EmailHistoryRecord,
        warnings: &mut Vec<DeliveryErrorKind>,
    ) {
        let write = tokio::time::timeout(HISTORY_WRITE_TIMEOUT, self.history.insert(record));
        let result = match write.await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(NotificationError::Timeout(HISTORY_WRITE_TIMEOUT).to_string()),
        };
        if let Err(detail) = result {
            let err = NotificationError::LogFailed(detail);
            tracing::error!(
                error.category = error::category::INFRASTRUCTURE,
                error.kind = error::kind::HISTORY_PERSIST,
                error = %err,
                tracking_id = %record.tracking_id,
                "送信履歴の記録に失敗"
            );
            warnings.extend(err.kind());
        }
    }

    /// フォローアップを予約として記録する
    ///
    /// 予約の追跡 ID は元の送信と同じにし、後から突き合わせられるようにする。
    async fn schedule_follow_up(
        &self,
        request: &ValidatedRequest,
        tracking_id: &str,
        now: DateTime<Utc>,
        warnings: &mut Vec<DeliveryErrorKind>,
    ) {
        let scheduled_for = now + Duration::days(i64::from(self.settings.follow_up_delay_days));
        let record = EmailHistoryRecord {
            id:                EmailHistoryId::new(),
            recipient:         request.recipient.clone(),
            email_type:        EmailType::FollowUpReminder,
            subject:           EmailType::FollowUpReminder.subject().to_string(),
            sent_at:           now,
            status:            SendStatus::Scheduled,
            tracking_id:       tracking_id.to_string(),
            related_entity_id: related_entity_id(&request.data),
            service_used:      None,
            error_message:     None,
            scheduled_for:     Some(scheduled_for),
        };

        let before = warnings.len();
        self.record_history(&record, warnings).await;
        if warnings.len() == before {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::FOLLOW_UP_SCHEDULED,
                event.entity_type = event::entity_type::EMAIL_HISTORY,
                event.entity_id = %record.id,
                event.result = event::result::SUCCESS,
                scheduled_for = %scheduled_for,
                "フォローアップを予約"
            );
        }
    }
}

fn validate(input: SendEmailInput) -> Result<ValidatedRequest, MailServiceError> {
    let email_type = input
        .email_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MailServiceError::InvalidRequest("type は必須です".to_string()))?;
    let email_type: EmailType = email_type.parse().map_err(|_| {
        MailServiceError::InvalidRequest(format!("未知のメール種別です: {email_type}"))
    })?;

    let recipient = input
        .recipient_email
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| MailServiceError::InvalidRequest("recipientEmail は必須です".to_string()))?
        .to_string();
    if !recipient.validate_email() {
        return Err(MailServiceError::InvalidRequest(
            "recipientEmail の形式が不正です".to_string(),
        ));
    }

    let data = match input.data {
        Some(Value::Object(data)) => data,
        Some(_) => {
            return Err(MailServiceError::InvalidRequest(
                "data はオブジェクトである必要があります".to_string(),
            ));
        }
        None => {
            return Err(MailServiceError::InvalidRequest(
                "data は必須です".to_string(),
            ));
        }
    };

    Ok(ValidatedRequest {
        email_type,
        recipient,
        data,
        schedule_follow_up: input.schedule_follow_up,
    })
}

fn related_entity_id(data: &Map<String, Value>) -> Option<String> {
    data_text(data, &["assessmentId", "assessment_id"])
}

/// 送信結果から履歴レコードを組み立てる
fn history_record(
    request: &ValidatedRequest,
    message: &EmailMessage,
    delivery: &DeliveryResult,
    tracking_id: &str,
    now: DateTime<Utc>,
) -> EmailHistoryRecord {
    let error_message = (!delivery.success).then(|| {
        let details: Vec<String> = delivery
            .attempts
            .iter()
            .map(|a| format!("{}: {}", a.provider, a.detail.as_deref().unwrap_or("")))
            .collect();
        let kind = delivery
            .error
            .map_or_else(String::new, |kind| kind.to_string());
        if details.is_empty() {
            kind
        } else {
            format!("{kind} ({})", details.join("; "))
        }
    });

    EmailHistoryRecord {
        id: EmailHistoryId::new(),
        recipient: request.recipient.clone(),
        email_type: request.email_type,
        subject: message.subject.clone(),
        sent_at: now,
        status: if delivery.success {
            SendStatus::Sent
        } else {
            SendStatus::Failed
        },
        tracking_id: tracking_id.to_string(),
        related_entity_id: related_entity_id(&request.data),
        service_used: delivery.successful_attempt().map(|a| a.provider.clone()),
        error_message,
        scheduled_for: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use notifly_domain::clock::FixedClock;
    use notifly_infra::{
        mock::{MockAttachmentGenerator, MockEmailHistoryRepository, MockNotificationSender},
        notification::{NotificationSender, ProviderRegistry},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    struct Fixture {
        server:    MockNotificationSender,
        secondary: MockNotificationSender,
        history:   MockEmailHistoryRepository,
        pdf:       MockAttachmentGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                server:    MockNotificationSender::server(),
                secondary: MockNotificationSender::secondary(),
                history:   MockEmailHistoryRepository::new(),
                pdf:       MockAttachmentGenerator::returning(b"%PDF-1.7".to_vec()),
            }
        }

        fn now() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
        }

        fn service(&self, server: bool, secondary: bool) -> SendEmailService {
            let registry = ProviderRegistry::new(
                server.then(|| Arc::new(self.server.clone()) as Arc<dyn NotificationSender>),
                secondary
                    .then(|| Arc::new(self.secondary.clone()) as Arc<dyn NotificationSender>),
            );
            SendEmailService::new(
                DeliveryOrchestrator::new(Arc::new(registry), StdDuration::from_secs(15)),
                TemplateRenderer::new().unwrap(),
                Arc::new(self.history.clone()),
                Some(Arc::new(self.pdf.clone())),
                Arc::new(FixedClock::new(Self::now())),
                SendEmailSettings {
                    base_url:             "https://notifly.test".to_string(),
                    follow_up_delay_days: 7,
                },
            )
        }
    }

    fn report_input(schedule_follow_up: bool) -> SendEmailInput {
        SendEmailInput {
            email_type: Some("assessment_report".to_string()),
            recipient_email: Some("student@example.com".to_string()),
            data: Some(json!({
                "name": "张三",
                "assessmentId": "A-42",
                "dimensionAdvice": {"focus": "每天专注 25 分钟"},
                "nextSteps": ["制定计划"],
            })),
            schedule_follow_up,
        }
    }

    #[tokio::test]
    async fn test_測評レポートはpdfを添付してserverで送る() {
        let fixture = Fixture::new();
        let sut = fixture.service(true, true);

        let outcome = sut.send(report_input(false)).await.unwrap();

        assert!(outcome.delivery.success);
        assert!(!outcome.delivery.attachments_dropped);
        assert!(outcome.warnings.is_empty());
        let sent = fixture.server.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "assessment-report.pdf");
        assert_eq!(fixture.pdf.requests()[0]["assessmentId"], "A-42");
    }

    #[tokio::test]
    async fn test_送信成功時に履歴をsentで記録する() {
        let fixture = Fixture::new();
        let sut = fixture.service(true, false);

        let outcome = sut.send(report_input(false)).await.unwrap();

        let records = fixture.history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, SendStatus::Sent);
        assert_eq!(records[0].tracking_id, outcome.tracking_id);
        assert_eq!(records[0].related_entity_id.as_deref(), Some("A-42"));
        assert_eq!(records[0].service_used.as_deref(), Some("smtp"));
        assert_eq!(records[0].sent_at, Fixture::now());
    }

    #[tokio::test]
    async fn test_pdf生成に失敗しても添付なしで送り警告を返す() {
        let mut fixture = Fixture::new();
        fixture.pdf = MockAttachmentGenerator::failing();
        let sut = fixture.service(true, true);

        let outcome = sut.send(report_input(false)).await.unwrap();

        assert!(outcome.delivery.success);
        assert_eq!(
            outcome.warnings,
            vec![DeliveryErrorKind::AttachmentGenerationFailed]
        );
        // 添付がないので添付なし経路（Secondary 優先）になる
        assert_eq!(fixture.secondary.send_count(), 1);
        assert_eq!(fixture.server.send_count(), 0);
    }

    #[tokio::test]
    async fn test_履歴の記録に失敗しても送信は成功する() {
        let fixture = Fixture::new();
        fixture.history.fail_all();
        let sut = fixture.service(false, true);

        let outcome = sut.send(report_input(false)).await.unwrap();

        assert!(outcome.delivery.success);
        assert_eq!(
            outcome.warnings,
            vec![DeliveryErrorKind::HistoryPersistFailed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_履歴の書き込みが応答しなくても上限時間で打ち切り送信は成功する() {
        let fixture = Fixture::new();
        fixture.history.hang();
        let sut = fixture.service(true, true);

        let started = tokio::time::Instant::now();
        let outcome = sut.send(report_input(false)).await.unwrap();

        assert!(outcome.delivery.success);
        assert_eq!(
            outcome.warnings,
            vec![DeliveryErrorKind::HistoryPersistFailed]
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= HISTORY_WRITE_TIMEOUT);
        assert!(elapsed < StdDuration::from_secs(60));
        assert_eq!(fixture.server.send_count(), 1);
    }

    #[tokio::test]
    async fn test_フォローアップ指定時は予約を記録する() {
        let fixture = Fixture::new();
        let sut = fixture.service(true, true);

        let outcome = sut.send(report_input(true)).await.unwrap();

        let records = fixture.history.records();
        assert_eq!(records.len(), 2);
        let follow_up = &records[1];
        assert_eq!(follow_up.email_type, EmailType::FollowUpReminder);
        assert_eq!(follow_up.status, SendStatus::Scheduled);
        assert_eq!(follow_up.tracking_id, outcome.tracking_id);
        assert_eq!(
            follow_up.scheduled_for,
            Some(Fixture::now() + Duration::days(7))
        );
    }

    #[tokio::test]
    async fn test_送信失敗時はフォローアップを予約しない() {
        let fixture = Fixture::new();
        fixture.server.fail_next(5, "down");
        fixture.secondary.fail_next(5, "down");
        let sut = fixture.service(true, true);

        let result = sut.send(report_input(true)).await;

        let Err(MailServiceError::AllProvidersExhausted { attempts }) = result else {
            panic!("AllProvidersExhausted を期待: {result:?}");
        };
        assert_eq!(attempts.len(), 2);
        let records = fixture.history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, SendStatus::Failed);
        assert!(
            records[0]
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("AllProvidersExhausted")
        );
    }

    #[tokio::test]
    async fn test_プロバイダがなければno_provider_configuredを返す() {
        let fixture = Fixture::new();
        let sut = fixture.service(false, false);

        let result = sut.send(report_input(false)).await;

        assert!(matches!(result, Err(MailServiceError::NoProviderConfigured)));
        assert_eq!(fixture.history.records()[0].status, SendStatus::Failed);
    }

    #[tokio::test]
    async fn test_追跡idは送信ごとに異なる() {
        let fixture = Fixture::new();
        let sut = fixture.service(false, true);

        let first = sut.send(report_input(false)).await.unwrap();
        let second = sut.send(report_input(false)).await.unwrap();

        assert_ne!(first.tracking_id, second.tracking_id);
    }

    #[rstest]
    #[case::種別なし(None, Some("a@example.com"), Some(json!({})))]
    #[case::未知の種別(Some("newsletter"), Some("a@example.com"), Some(json!({})))]
    #[case::宛先なし(Some("welcome"), None, Some(json!({})))]
    #[case::宛先が空白(Some("welcome"), Some("  "), Some(json!({})))]
    #[case::宛先の形式不正(Some("welcome"), Some("not-an-email"), Some(json!({})))]
    #[case::dataなし(Some("welcome"), Some("a@example.com"), None)]
    #[case::dataが配列(Some("welcome"), Some("a@example.com"), Some(json!([])))]
    #[tokio::test]
    async fn test_不正なリクエストはプロバイダに触れずに拒否する(
        #[case] email_type: Option<&str>,
        #[case] recipient: Option<&str>,
        #[case] data: Option<Value>,
    ) {
        let fixture = Fixture::new();
        let sut = fixture.service(true, true);

        let result = sut
            .send(SendEmailInput {
                email_type: email_type.map(str::to_string),
                recipient_email: recipient.map(str::to_string),
                data,
                schedule_follow_up: false,
            })
            .await;

        assert!(matches!(result, Err(MailServiceError::InvalidRequest(_))));
        assert_eq!(fixture.server.send_count(), 0);
        assert_eq!(fixture.secondary.send_count(), 0);
        assert!(fixture.history.records().is_empty());
    }
}
