//! # Mail Service 設定
//!
//! 環境変数から Mail Service の設定を読み込む。
//!
//! 送信プロバイダの有無は設定の有無で決まる:
//!
//! | 変数 | 効果 |
//! |------|------|
//! | `SMTP_HOST` | Server 役（添付対応）に SMTP を割り当てる |
//! | `SES_REGION` | Secondary 役（添付非対応）に SES を割り当てる |
//! | `NOTIFICATION_BACKEND=noop` | Secondary 役に Noop を割り当てる（`SES_REGION` より優先） |

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 値を解釈できない
    #[error("{key} の値が不正です: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Mail Service の設定
#[derive(Debug, Clone)]
pub struct MailServiceConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL（未設定なら送信履歴はログのみ）
    pub database_url: Option<String>,
    /// メール内リンクと計測 URL のベース URL
    pub base_url: String,
    /// PDF 生成サービスの URL（未設定なら添付なしで送信）
    pub pdf_service_url: Option<String>,
    /// フォローアップを予約するまでの日数
    pub follow_up_delay_days: u32,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// 送信プロバイダの設定
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// `noop` のとき Secondary 役を Noop にする
    pub backend:         Option<String>,
    /// 送信元メールアドレス
    pub from_address:    String,
    /// SMTP 設定（`SMTP_HOST` がある場合のみ）
    pub smtp:            Option<SmtpConfig>,
    /// SES のリージョン
    pub ses_region:      Option<String>,
    /// 1 回の送信試行のタイムアウト
    pub attempt_timeout: Duration,
}

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpConfig {
    pub host:     String,
    pub port:     u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl NotificationConfig {
    /// Noop を Secondary 役に使うかどうか
    pub fn uses_noop(&self) -> bool {
        self.backend
            .as_deref()
            .is_some_and(|b| b.eq_ignore_ascii_case("noop"))
    }
}

impl MailServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の変数ソースから設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&var, "SMTP_PORT", 1025)?,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
            }),
            None => None,
        };

        Ok(Self {
            host: var("MAIL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "MAIL_PORT", 3002)?,
            database_url: var("DATABASE_URL"),
            base_url: resolve_base_url(
                var("DEPLOYMENT_URL").as_deref(),
                var("PUBLIC_SITE_URL").as_deref(),
            ),
            pdf_service_url: var("PDF_SERVICE_URL"),
            follow_up_delay_days: parse_or(&var, "FOLLOW_UP_DELAY_DAYS", 7)?,
            notification: NotificationConfig {
                backend: var("NOTIFICATION_BACKEND"),
                from_address: var("NOTIFICATION_FROM_ADDRESS")
                    .unwrap_or_else(|| "noreply@notifly.example.com".to_string()),
                smtp,
                ses_region: var("SES_REGION"),
                attempt_timeout: Duration::from_secs(parse_or(
                    &var,
                    "NOTIFICATION_ATTEMPT_TIMEOUT_SECS",
                    15,
                )?),
            },
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// メール内リンクのベース URL を決める
///
/// 優先順位: デプロイ先 URL > 公開サイト URL > ローカル開発用 URL。
/// デプロイ先 URL はホスト名だけで渡されることがあるため、
/// スキームがなければ `https://` を補う。末尾の `/` は取り除く。
pub fn resolve_base_url(deployment_url: Option<&str>, public_site_url: Option<&str>) -> String {
    let deployment = deployment_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| {
            if u.contains("://") {
                u.to_string()
            } else {
                format!("https://{u}")
            }
        });
    let public_site = public_site_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    deployment
        .or(public_site)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}
