//! # 添付ファイル生成
//!
//! 測評レポートの PDF を外部レンダリングサービスに生成させる。
//! 生成に失敗しても送信は添付なしで続行する（呼び出し元で警告に吸収）。

use std::time::Duration;

use async_trait::async_trait;
use notifly_domain::notification::Attachment;
use serde_json::Value;

use crate::error::InfraError;

/// PDF 添付のファイル名
pub const PDF_FILENAME: &str = "assessment-report.pdf";
/// PDF 添付の MIME タイプ
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// 生成済み PDF を添付ファイルにする
pub fn pdf_attachment(content: Vec<u8>) -> Attachment {
    Attachment::new(PDF_FILENAME, content, PDF_CONTENT_TYPE)
}

/// 添付ファイル生成トレイト
#[async_trait]
pub trait AttachmentGenerator: Send + Sync {
    /// リクエストの `data` から PDF のバイト列を生成する
    async fn generate(&self, data: &Value) -> Result<Vec<u8>, InfraError>;
}

/// HTTP 経由の PDF 生成
///
/// `data` を JSON のまま `PDF_SERVICE_URL` に POST し、応答本文を PDF として受け取る。
#[derive(Debug, Clone)]
pub struct HttpPdfGenerator {
    client:   reqwest::Client,
    endpoint: String,
}

impl HttpPdfGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AttachmentGenerator for HttpPdfGenerator {
    #[tracing::instrument(skip_all, level = "debug", fields(endpoint = %self.endpoint))]
    async fn generate(&self, data: &Value) -> Result<Vec<u8>, InfraError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(data)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(InfraError::http("PDF サービスが空の応答を返した"));
        }

        Ok(bytes.to_vec())
    }
}
