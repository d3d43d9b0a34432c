//! # Notifly ドメイン層
//!
//! トランザクションメール配信の中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは I/O を一切持たない。送信・永続化・外部サービス呼び出しは
//! インフラ層が担い、ここでは以下の純粋なロジックのみを提供する:
//!
//! - **メッセージモデル**: メール本文・添付ファイル・送信結果
//! - **配信計画**: プロバイダ能力スナップショットから送信順序を決める決定表
//! - **追跡トークン**: 開封・クリック計測 URL の生成
//! - **コンテンツ正規化**: 形の揃わない上流データを表示用リストへ変換
//!
//! ## 依存関係の方向
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 時刻プロバイダ
//! - [`content`] - アドバイス・次のステップの正規化
//! - [`error`] - エラー分類と通知エラー
//! - [`notification`] - メッセージ、プロバイダ能力、配信計画、送信履歴
//! - [`tracking`] - 追跡トークンと計測 URL

#[macro_use]
mod macros;

pub mod clock;
pub mod content;
pub mod error;
pub mod notification;
pub mod tracking;

pub use error::{DeliveryErrorKind, NotificationError};
