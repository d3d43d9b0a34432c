//! # 通知ユースケース
//!
//! メールのレンダリング、プロバイダへの配信、送信履歴の記録を組み合わせる。
//!
//! - [`TemplateRenderer`]: メール種別ごとの HTML/plaintext 生成
//! - [`DeliveryOrchestrator`]: 配信計画に沿ったプロバイダ呼び出し
//! - [`SendEmailService`]: リクエスト 1 件の処理全体

pub mod delivery;
pub mod service;
pub mod template_renderer;

pub use delivery::DeliveryOrchestrator;
pub use service::{SendEmailInput, SendEmailOutcome, SendEmailService, SendEmailSettings};
pub use template_renderer::{RenderRequest, TemplateRenderer};
