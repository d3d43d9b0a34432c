//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数と、ルーターの組み立てを定義する。
//!
//! - 各ハンドラはサブモジュールに配置
//! - ハンドラは薄く保ち、送信処理はユースケースに委譲

pub mod email;
pub mod health;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
pub use email::{EmailState, SendEmailRequest, SendEmailResponse, send_email};
pub use health::health_check;
use tower_http::trace::TraceLayer;

/// Mail Service のルーターを構築する
pub fn router(state: Arc<EmailState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/email/send", post(send_email))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
