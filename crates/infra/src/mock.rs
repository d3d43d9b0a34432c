//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! notifly-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use notifly_domain::{
    NotificationError,
    notification::{EmailHistoryRecord, EmailMessage},
};
use serde_json::Value;

use crate::{
    attachment::AttachmentGenerator,
    error::InfraError,
    notification::NotificationSender,
    repository::EmailHistoryRepository,
};

// ===== MockNotificationSender =====

/// 送信内容を記録するモック送信
///
/// `fail_next` で次の n 回を失敗させ、`hang` で応答を返さない状態にできる
/// （呼び出し側のタイムアウト検証用）。
#[derive(Clone)]
pub struct MockNotificationSender {
    name:                 &'static str,
    supports_attachments: bool,
    sent:                 Arc<Mutex<Vec<EmailMessage>>>,
    send_count:           Arc<AtomicU32>,
    fail_next_n:          Arc<AtomicU32>,
    error_message:        Arc<Mutex<String>>,
    hang:                 Arc<AtomicBool>,
}

impl MockNotificationSender {
    pub fn new(name: &'static str, supports_attachments: bool) -> Self {
        Self {
            name,
            supports_attachments,
            sent: Arc::new(Mutex::new(Vec::new())),
            send_count: Arc::new(AtomicU32::new(0)),
            fail_next_n: Arc::new(AtomicU32::new(0)),
            error_message: Arc::new(Mutex::new("mock failure".to_string())),
            hang: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 添付対応の Server 役（SMTP 相当）
    pub fn server() -> Self {
        Self::new("smtp", true)
    }

    /// 添付非対応の Secondary 役（SES 相当）
    pub fn secondary() -> Self {
        Self::new("ses", false)
    }

    /// 次の `count` 回の送信を失敗させる
    pub fn fail_next(&self, count: u32, error: &str) {
        self.fail_next_n.store(count, Ordering::SeqCst);
        *self.error_message.lock().unwrap() = error.to_string();
    }

    /// 以降の送信を応答しないままにする
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// `send_email` が呼ばれた回数（失敗・ハングを含む）
    pub fn send_count(&self) -> u32 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// 送信に成功したメッセージ
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_attachments(&self) -> bool {
        self.supports_attachments
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let fail_count = self.fail_next_n.load(Ordering::SeqCst);
        if fail_count > 0 {
            self.fail_next_n.fetch_sub(1, Ordering::SeqCst);
            return Err(NotificationError::SendFailed(
                self.error_message.lock().unwrap().clone(),
            ));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockEmailHistoryRepository =====

#[derive(Clone, Default)]
pub struct MockEmailHistoryRepository {
    records: Arc<Mutex<Vec<EmailHistoryRecord>>>,
    failing: Arc<AtomicBool>,
    hang:    Arc<AtomicBool>,
}

impl MockEmailHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の挿入をすべて失敗させる
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// 以降の挿入を応答しないままにする
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<EmailHistoryRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailHistoryRepository for MockEmailHistoryRepository {
    async fn insert(&self, record: &EmailHistoryRecord) -> Result<(), InfraError> {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("mock history failure"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ===== MockAttachmentGenerator =====

/// 固定のバイト列を返す、または常に失敗する添付生成
#[derive(Clone)]
pub struct MockAttachmentGenerator {
    result:   Option<Vec<u8>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockAttachmentGenerator {
    pub fn returning(content: Vec<u8>) -> Self {
        Self {
            result:   Some(content),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            result:   None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 受け取った `data`
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentGenerator for MockAttachmentGenerator {
    async fn generate(&self, data: &Value) -> Result<Vec<u8>, InfraError> {
        self.requests.lock().unwrap().push(data.clone());
        self.result
            .clone()
            .ok_or_else(|| InfraError::http("mock pdf failure"))
    }
}
