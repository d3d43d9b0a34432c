//! # PostgreSQL データベース接続管理
//!
//! 送信履歴を記録するための接続プールを作成する。
//!
//! プールは起動時に一度だけ作成し、リポジトリ間で共有する。
//! `DATABASE_URL` が未設定の環境では作成しない（履歴は Noop 実装に切り替わる）。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use notifly_infra::db;
//!
//! let pool = db::create_pool("postgres://localhost/notifly").await?;
//! db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

/// データベースマイグレーションを実行する
///
/// 適用済みのマイグレーションはスキップされる。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL 接続プールを作成する
///
/// # 設定値
///
/// - `max_connections(10)`: 履歴の書き込みは 1 送信あたり高々 2 行
/// - `acquire_timeout(5秒)`: 超過時はエラー（送信結果には影響しない）
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
