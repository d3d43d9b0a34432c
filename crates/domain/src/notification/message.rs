//! メールメッセージと添付ファイル

use std::fmt;

/// 添付ファイル
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// ファイル名（例: `assessment-report.pdf`）
    pub filename:     String,
    /// ファイル本体
    pub content:      Vec<u8>,
    /// MIME タイプ（例: `application/pdf`）
    pub content_type: String,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content,
            content_type: content_type.into(),
        }
    }
}

// 本体バイト列はログに出さずサイズだけ表示する
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。1 回の送信の間、呼び出し元が所有し不変のまま扱う。
/// `NotificationSender` には参照で渡される。
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:          String,
    /// 件名
    pub subject:     String,
    /// HTML 本文
    pub html_body:   String,
    /// プレーンテキスト本文
    pub text_body:   String,
    /// 添付ファイル
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    /// 添付ファイルを持つかどうか
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// 添付ファイルを除いた複製を返す
    ///
    /// 添付非対応のプロバイダに渡すときに使う。
    pub fn without_attachments(&self) -> Self {
        Self {
            to:          self.to.clone(),
            subject:     self.subject.clone(),
            html_body:   self.html_body.clone(),
            text_body:   self.text_body.clone(),
            attachments: Vec::new(),
        }
    }
}
