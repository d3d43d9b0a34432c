//! # リポジトリ実装
//!
//! 送信履歴の永続化を提供する。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: ユースケースはトレイトのみに依存する
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod email_history_repository;

pub use email_history_repository::{
    EmailHistoryRepository,
    NoopEmailHistoryRepository,
    PostgresEmailHistoryRepository,
};
