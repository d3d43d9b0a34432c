//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンでメールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **リンクはすべて計測 URL 経由**: テンプレートには [`TrackingUrls::click_url`] で
//!   包んだ URL だけを渡す
//! - **開封ピクセルは 1 つだけ**: テンプレートには含めず、HTML 本文の `</body>` 直前に
//!   レンダラーが 1 回だけ挿入する
//! - **リストは正規化済み**: アドバイス・次のステップは [`normalize`] を通してから渡す

use notifly_domain::{
    NotificationError,
    content::{ContentField, normalize},
    notification::{Attachment, EmailMessage, EmailType},
    tracking::TrackingUrls,
};
use serde_json::{Map, Value};
use tera::{Context, Tera};

/// レンダリングの入力
pub struct RenderRequest<'a> {
    pub email_type:  EmailType,
    pub recipient:   &'a str,
    /// リクエストの `data`
    pub data:        &'a Map<String, Value>,
    pub tracking:    &'a TrackingUrls,
    pub attachments: Vec<Attachment>,
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、メール種別とリクエストデータから
/// `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "base.html",
                    include_str!("../../../templates/emails/base.html"),
                ),
                (
                    "assessment_report.html",
                    include_str!("../../../templates/emails/assessment_report.html"),
                ),
                (
                    "assessment_report.txt",
                    include_str!("../../../templates/emails/assessment_report.txt"),
                ),
                (
                    "follow_up_reminder.html",
                    include_str!("../../../templates/emails/follow_up_reminder.html"),
                ),
                (
                    "follow_up_reminder.txt",
                    include_str!("../../../templates/emails/follow_up_reminder.txt"),
                ),
                (
                    "welcome.html",
                    include_str!("../../../templates/emails/welcome.html"),
                ),
                (
                    "welcome.txt",
                    include_str!("../../../templates/emails/welcome.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// メールメッセージを生成する
    pub fn render(&self, request: RenderRequest<'_>) -> Result<EmailMessage, NotificationError> {
        let template_name: &'static str = request.email_type.into();
        let subject = request.email_type.subject();
        let context = build_context(&request, subject);

        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;
        let html_body = insert_open_pixel(&html_body, &request.tracking.open_url());

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: request.recipient.to_string(),
            subject: subject.to_string(),
            html_body,
            text_body,
            attachments: request.attachments,
        })
    }
}

/// テンプレートコンテキストを構築する
fn build_context(request: &RenderRequest<'_>, subject: &str) -> Context {
    let data = request.data;
    let tracking = request.tracking;
    let base_url = tracking.base_url();

    let mut context = Context::new();
    context.insert("subject", subject);
    context.insert("name", &data_text(data, &["name"]));
    context.insert("home_url", &tracking.click_url(base_url));

    let (cta_target, cta_label) = match request.email_type {
        EmailType::AssessmentReport => {
            context.insert("total_score", &data_text(data, &["totalScore", "total_score"]));
            context.insert(
                "dimension_advice",
                &normalize(
                    ContentField::DimensionAdvice,
                    data_field(data, &["dimensionAdvice", "dimension_advice"]),
                ),
            );
            context.insert(
                "next_steps",
                &normalize(
                    ContentField::NextSteps,
                    data_field(data, &["nextSteps", "next_steps"]),
                ),
            );
            context.insert("has_pdf", &!request.attachments.is_empty());
            let target = match data_text(data, &["assessmentId", "assessment_id"]) {
                Some(id) => format!("{base_url}/assessment/{}", urlencoding::encode(&id)),
                None => format!("{base_url}/assessment"),
            };
            (target, "查看完整报告")
        }
        EmailType::FollowUpReminder => {
            context.insert(
                "next_steps",
                &normalize(
                    ContentField::NextSteps,
                    data_field(data, &["nextSteps", "next_steps"]),
                ),
            );
            (format!("{base_url}/assessment"), "重新测评")
        }
        EmailType::Welcome => (base_url.to_string(), "开始使用"),
    };

    context.insert("cta_url", &tracking.click_url(&cta_target));
    context.insert("cta_label", cta_label);
    context
}

/// 候補キーのうち最初に存在する値
fn data_field<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| data.get(*key))
}

/// 文字列または数値を表示用テキストとして取り出す
///
/// 空文字列・その他の型は `None`。
pub(crate) fn data_text(data: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match data_field(data, keys)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 開封計測ピクセルを HTML 本文に 1 つだけ挿入する
///
/// 最後の `</body>` の直前に置く。`</body>` がなければ末尾に追加する。
pub fn insert_open_pixel(html: &str, open_url: &str) -> String {
    let pixel = format!(
        r#"<img src="{open_url}" width="1" height="1" alt="" style="display:none;border:0;" />"#
    );

    match html.rfind("</body>") {
        Some(index) => {
            let (head, tail) = html.split_at(index);
            format!("{head}{pixel}\n{tail}")
        }
        None => format!("{html}{pixel}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use notifly_domain::{clock::FixedClock, tracking::TrackingTokenService};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    const BASE_URL: &str = "https://notifly.test";

    fn make_tracking() -> TrackingUrls {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let token = TrackingTokenService::new(Arc::new(FixedClock::new(now))).mint();
        TrackingUrls::new(token, BASE_URL)
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    fn render(
        email_type: EmailType,
        data: &Map<String, Value>,
        tracking: &TrackingUrls,
    ) -> EmailMessage {
        TemplateRenderer::new()
            .unwrap()
            .render(RenderRequest {
                email_type,
                recipient: "student@example.com",
                data,
                tracking,
                attachments: Vec::new(),
            })
            .unwrap()
    }

    /// `href="..."` の値をすべて取り出す
    fn hrefs(html: &str) -> Vec<String> {
        html.split("href=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_newが正常に初期化される() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_測評レポートは正規化したリストを順序どおりに描画する() {
        let tracking = make_tracking();
        let data = as_map(json!({
            "name": "张三",
            "assessmentId": "A-42",
            "totalScore": 86,
            "dimensionAdvice": {"time_management": "提前规划", "focus": "番茄工作法"},
            "nextSteps": ["第一步", "", " 第二步 "],
        }));

        let email = render(EmailType::AssessmentReport, &data, &tracking);

        assert_eq!(email.to, "student@example.com");
        assert_eq!(email.subject, "您的测评报告已生成");
        assert!(email.html_body.contains("张三"));
        assert!(email.html_body.contains("86"));
        let advice_pos = email.html_body.find("时间管理: 提前规划").unwrap();
        let focus_pos = email.html_body.find("专注力: 番茄工作法").unwrap();
        assert!(advice_pos < focus_pos);
        let first = email.html_body.find("<li>第一步</li>").unwrap();
        let second = email.html_body.find("<li>第二步</li>").unwrap();
        assert!(first < second);
        assert!(email.text_body.contains("1. 第一步"));
        assert!(email.text_body.contains("2. 第二步"));
    }

    #[test]
    fn test_欠けたリストは既定リストで描画する() {
        let tracking = make_tracking();
        let data = as_map(json!({ "name": "李四" }));

        let email = render(EmailType::AssessmentReport, &data, &tracking);

        for item in ContentField::NextSteps.default_list() {
            assert!(email.html_body.contains(&item), "{item}");
        }
        for item in ContentField::DimensionAdvice.default_list() {
            assert!(email.text_body.contains(&item), "{item}");
        }
    }

    #[rstest]
    #[case(EmailType::AssessmentReport)]
    #[case(EmailType::FollowUpReminder)]
    #[case(EmailType::Welcome)]
    fn test_すべてのリンクは計測url経由になる(#[case] email_type: EmailType) {
        let tracking = make_tracking();
        let data = as_map(json!({ "name": "王五", "assessmentId": "A-42" }));

        let email = render(email_type, &data, &tracking);

        let links = hrefs(&email.html_body);
        assert!(!links.is_empty());
        for link in links {
            assert!(
                link.starts_with(&format!("{BASE_URL}/api/email/track/click?trackingId=")),
                "{link}"
            );
        }
    }

    #[rstest]
    #[case(EmailType::AssessmentReport)]
    #[case(EmailType::FollowUpReminder)]
    #[case(EmailType::Welcome)]
    fn test_開封ピクセルはhtmlに1回だけ現れtextには現れない(#[case] email_type: EmailType) {
        let tracking = make_tracking();
        let data = as_map(json!({}));

        let email = render(email_type, &data, &tracking);

        let open_url = tracking.open_url();
        assert_eq!(email.html_body.matches(&open_url).count(), 1);
        assert!(!email.text_body.contains(&open_url));
        let pixel_pos = email.html_body.find(&open_url).unwrap();
        assert!(pixel_pos < email.html_body.rfind("</body>").unwrap());
    }

    #[test]
    fn test_測評レポートのctaは測評idのページを指す() {
        let tracking = make_tracking();
        let data = as_map(json!({ "assessmentId": "A-42" }));

        let email = render(EmailType::AssessmentReport, &data, &tracking);

        let expected = tracking.click_url("https://notifly.test/assessment/A-42");
        assert!(email.html_body.contains(&expected));
        assert!(email.text_body.contains(&expected));
    }

    #[test]
    fn test_ユーザー入力はhtmlエスケープされる() {
        let tracking = make_tracking();
        let data = as_map(json!({ "nextSteps": ["<script>alert(1)</script>"] }));

        let email = render(EmailType::FollowUpReminder, &data, &tracking);

        assert!(!email.html_body.contains("<script>"));
        assert!(email.html_body.contains("&lt;script&gt;"));
    }

    #[rstest]
    #[case::body閉じタグの直前("<html><body><p>x</p></body></html>", "<html><body><p>x</p><img")]
    #[case::閉じタグなしは末尾("<p>x</p>", "<p>x</p><img")]
    fn test_開封ピクセルの挿入位置(#[case] html: &str, #[case] expected_prefix: &str) {
        let result = insert_open_pixel(html, "https://x.test/api/email/track/open?trackingId=1");

        assert!(result.starts_with(expected_prefix), "{result}");
        assert_eq!(result.matches("<img").count(), 1);
    }

    #[rstest]
    #[case(json!({"name": "  张三 "}), Some("张三"))]
    #[case(json!({"name": 7}), Some("7"))]
    #[case(json!({"name": ""}), None)]
    #[case(json!({"name": ["x"]}), None)]
    #[case(json!({}), None)]
    fn test_data_textは文字列と数値だけを取り出す(#[case] data: Value, #[case] expected: Option<&str>) {
        assert_eq!(
            data_text(&as_map(data), &["name"]).as_deref(),
            expected
        );
    }
}
