//! EmailHistoryRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとに独立したデータベースを作成しマイグレーションを適用する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p notifly-infra --test email_history_repository_test
//! ```

use chrono::{Duration, TimeZone, Utc};
use notifly_domain::notification::{EmailHistoryId, EmailHistoryRecord, EmailType, SendStatus};
use notifly_infra::repository::{EmailHistoryRepository, PostgresEmailHistoryRepository};
use pretty_assertions::assert_eq;
use sqlx::{PgPool, Row};

fn sent_record() -> EmailHistoryRecord {
    EmailHistoryRecord {
        id:                EmailHistoryId::new(),
        recipient:         "student@example.com".to_string(),
        email_type:        EmailType::AssessmentReport,
        subject:           EmailType::AssessmentReport.subject().to_string(),
        sent_at:           Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        status:            SendStatus::Sent,
        tracking_id:       "1772352000000-abcdefghi".to_string(),
        related_entity_id: Some("A-42".to_string()),
        service_used:      Some("smtp".to_string()),
        error_message:     None,
        scheduled_for:     None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insertで送信履歴が保存される(pool: PgPool) {
    let sut = PostgresEmailHistoryRepository::new(pool.clone());
    let record = sent_record();

    sut.insert(&record).await.unwrap();

    let row = sqlx::query(
        "SELECT email_type, status, tracking_id, related_entity_id, service_used \
         FROM email_history WHERE id = $1",
    )
    .bind(*record.id.as_uuid())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>("email_type"), "assessment_report");
    assert_eq!(row.get::<String, _>("status"), "sent");
    assert_eq!(row.get::<String, _>("tracking_id"), record.tracking_id);
    assert_eq!(
        row.get::<Option<String>, _>("related_entity_id").as_deref(),
        Some("A-42")
    );
    assert_eq!(
        row.get::<Option<String>, _>("service_used").as_deref(),
        Some("smtp")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_予約レコードはscheduled_forとともに保存される(pool: PgPool) {
    let sut = PostgresEmailHistoryRepository::new(pool.clone());
    let sent = sent_record();
    let scheduled_for = sent.sent_at + Duration::days(7);
    let record = EmailHistoryRecord {
        id: EmailHistoryId::new(),
        email_type: EmailType::FollowUpReminder,
        subject: EmailType::FollowUpReminder.subject().to_string(),
        status: SendStatus::Scheduled,
        service_used: None,
        scheduled_for: Some(scheduled_for),
        ..sent
    };

    sut.insert(&record).await.unwrap();

    let row = sqlx::query("SELECT status, scheduled_for FROM email_history WHERE id = $1")
        .bind(*record.id.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("status"), "scheduled");
    assert_eq!(
        row.get::<Option<chrono::DateTime<Utc>>, _>("scheduled_for"),
        Some(scheduled_for)
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_同じidの二重挿入はエラーになる(pool: PgPool) {
    let sut = PostgresEmailHistoryRepository::new(pool);
    let record = sent_record();

    sut.insert(&record).await.unwrap();
    let result = sut.insert(&record).await;

    assert!(result.is_err());
}
