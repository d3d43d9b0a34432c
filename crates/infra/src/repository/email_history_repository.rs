//! # EmailHistoryRepository
//!
//! 送信履歴の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 書き込み失敗は呼び出し元で警告として吸収する
//! - **追記のみ**: 送信結果ごとに 1 行を挿入し、更新はしない
//! - **追跡 ID で突き合わせ**: 開封・クリックの記録は `tracking_id` で結合する

use async_trait::async_trait;
use notifly_domain::notification::EmailHistoryRecord;
use sqlx::PgPool;

use crate::error::InfraError;

/// 送信履歴リポジトリトレイト
#[async_trait]
pub trait EmailHistoryRepository: Send + Sync {
    /// 送信履歴を挿入する
    async fn insert(&self, record: &EmailHistoryRecord) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の EmailHistoryRepository
#[derive(Debug, Clone)]
pub struct PostgresEmailHistoryRepository {
    pool: PgPool,
}

impl PostgresEmailHistoryRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailHistoryRepository for PostgresEmailHistoryRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(tracking_id = %record.tracking_id))]
    async fn insert(&self, record: &EmailHistoryRecord) -> Result<(), InfraError> {
        let email_type: &'static str = record.email_type.into();
        let status: &'static str = record.status.into();

        sqlx::query(
            r#"
            INSERT INTO email_history (
                id, recipient, email_type, subject, sent_at, status,
                tracking_id, related_entity_id, service_used,
                error_message, scheduled_for
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(&record.recipient)
        .bind(email_type)
        .bind(&record.subject)
        .bind(record.sent_at)
        .bind(status)
        .bind(&record.tracking_id)
        .bind(record.related_entity_id.as_deref())
        .bind(record.service_used.as_deref())
        .bind(record.error_message.as_deref())
        .bind(record.scheduled_for)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 記録先を持たない EmailHistoryRepository
///
/// `DATABASE_URL` 未設定時に使う。内容をログに出すだけで常に成功する。
#[derive(Debug, Clone, Default)]
pub struct NoopEmailHistoryRepository;

#[async_trait]
impl EmailHistoryRepository for NoopEmailHistoryRepository {
    async fn insert(&self, record: &EmailHistoryRecord) -> Result<(), InfraError> {
        tracing::debug!(
            tracking_id = %record.tracking_id,
            email_type = %record.email_type,
            status = %record.status,
            "Noop: 送信履歴の記録をスキップ"
        );
        Ok(())
    }
}
