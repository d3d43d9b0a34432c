//! # Mail Service エラー定義
//!
//! 送信ユースケースのエラーと、HTTP レスポンスへの変換を定義する。
//!
//! レスポンス本文は `{ "error": メッセージ, "code": 分類名 }`。
//! `AllProvidersExhausted` のみ、呼び出し元が原因を追えるよう試行記録を添える。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notifly_domain::{DeliveryErrorKind, notification::DeliveryAttempt};
use serde::Serialize;
use thiserror::Error;

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error:    String,
    pub code:     String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<DeliveryAttempt>>,
}

/// Mail Service で発生するエラー
#[derive(Debug, Error)]
pub enum MailServiceError {
    /// 必須フィールドの欠落・形式不正
    #[error("リクエストが不正です: {0}")]
    InvalidRequest(String),

    /// 送信プロバイダが 1 つも設定されていない
    #[error("送信プロバイダが設定されていません")]
    NoProviderConfigured,

    /// すべての送信試行が失敗した
    #[error("すべての送信プロバイダで送信に失敗しました")]
    AllProvidersExhausted { attempts: Vec<DeliveryAttempt> },

    /// 内部エラー（テンプレート不備など）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl MailServiceError {
    /// 配信エラー分類
    ///
    /// 内部エラーは分類外。
    pub fn kind(&self) -> Option<DeliveryErrorKind> {
        match self {
            Self::InvalidRequest(_) => Some(DeliveryErrorKind::InvalidRequest),
            Self::NoProviderConfigured => Some(DeliveryErrorKind::NoProviderConfigured),
            Self::AllProvidersExhausted { .. } => Some(DeliveryErrorKind::AllProvidersExhausted),
            Self::Internal(_) => None,
        }
    }
}

impl IntoResponse for MailServiceError {
    fn into_response(self) -> Response {
        let code = self
            .kind()
            .map_or("InternalError".to_string(), |kind| kind.to_string());
        let message = self.to_string();

        let (status, error, attempts) = match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, message, None),
            Self::NoProviderConfigured => (StatusCode::SERVICE_UNAVAILABLE, message, None),
            Self::AllProvidersExhausted { attempts } => {
                (StatusCode::BAD_GATEWAY, message, Some(attempts))
            }
            Self::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code,
                attempts,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use notifly_domain::notification::{AttemptOutcome, DeliveryStrategy};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[rstest]
    #[case(MailServiceError::InvalidRequest("recipientEmail".into()), StatusCode::BAD_REQUEST, "InvalidRequest")]
    #[case(MailServiceError::NoProviderConfigured, StatusCode::SERVICE_UNAVAILABLE, "NoProviderConfigured")]
    #[case(MailServiceError::Internal("template".into()), StatusCode::INTERNAL_SERVER_ERROR, "InternalError")]
    #[tokio::test]
    async fn test_エラーごとのステータスとコード(
        #[case] error: MailServiceError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = error.into_response();

        assert_eq!(response.status(), status);
        let json = body_json(response).await;
        assert_eq!(json["code"], code);
        assert!(json.get("attempts").is_none());
    }

    #[tokio::test]
    async fn test_全試行失敗は試行記録を含めて502を返す() {
        let attempts = vec![DeliveryAttempt {
            provider: "ses".to_string(),
            strategy: DeliveryStrategy::SecondaryFirst,
            outcome:  AttemptOutcome::Failure,
            detail:   Some("timeout after 15s".to_string()),
        }];

        let response = MailServiceError::AllProvidersExhausted { attempts }.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["code"], "AllProvidersExhausted");
        assert_eq!(json["attempts"][0]["provider"], "ses");
        assert_eq!(json["attempts"][0]["detail"], "timeout after 15s");
    }
}
