//! # Notifly インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはドメイン層で定義されたモデルを外部システムへ橋渡しする。
//! 外部システムの詳細はトレイトの背後に隠し、ユースケースからは
//! `Arc<dyn Trait>` で注入して使う。
//!
//! ## 責務
//!
//! - **メール送信**: SMTP（添付対応）、SES（添付非対応）、Noop の各トランスポート
//! - **プロバイダレジストリ**: 起動時に確定する送信プロバイダの組
//! - **添付生成**: 外部 PDF レンダリングサービスの呼び出し
//! - **送信履歴**: PostgreSQL への記録
//!
//! ## 依存関係
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`attachment`] - 添付ファイル生成
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - 送信トランスポートとプロバイダレジストリ
//! - [`repository`] - 送信履歴リポジトリ

pub mod attachment;
pub mod db;
pub mod error;
pub mod notification;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::InfraError;
