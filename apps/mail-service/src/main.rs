//! # Mail Service サーバー
//!
//! トランザクションメール（測評レポート・フォローアップ・ウェルカム）を送信する内部サービス。
//!
//! ## 役割
//!
//! - **レンダリング**: メール種別ごとの HTML/plaintext 本文、計測 URL の埋め込み
//! - **配信**: 添付対応の Server（SMTP）と添付非対応の Secondary（SES）を使い分ける
//! - **記録**: 送信結果を PostgreSQL の送信履歴に残す
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `MAIL_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `MAIL_PORT` | No | ポート番号（デフォルト: `3002`） |
//! | `DATABASE_URL` | No | PostgreSQL 接続 URL（未設定なら履歴はログのみ） |
//! | `SMTP_HOST` | No | 設定すると Server プロバイダを有効化 |
//! | `SES_REGION` | No | 設定すると Secondary プロバイダを有効化 |
//! | `NOTIFICATION_BACKEND` | No | `noop` で Secondary を Noop に差し替え |
//! | `PDF_SERVICE_URL` | No | 測評レポートの PDF 生成サービス |
//!
//! ## 起動方法
//!
//! ```bash
//! SMTP_HOST=localhost NOTIFICATION_BACKEND=noop cargo run -p notifly-mail-service
//! ```

use std::{net::SocketAddr, sync::Arc, time::Duration};

use notifly_domain::clock::SystemClock;
use notifly_infra::{
    attachment::{AttachmentGenerator, HttpPdfGenerator},
    db,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        ProviderRegistry,
        SesNotificationSender,
        SmtpCredentials,
        SmtpNotificationSender,
    },
    repository::{
        EmailHistoryRepository,
        NoopEmailHistoryRepository,
        PostgresEmailHistoryRepository,
    },
};
use notifly_mail_service::{
    config::{MailServiceConfig, NotificationConfig},
    handler::{EmailState, router},
    usecase::{
        SendEmailService,
        SendEmailSettings,
        notification::{DeliveryOrchestrator, TemplateRenderer},
    },
};
use notifly_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// PDF 生成サービスの応答待ち上限
const PDF_TIMEOUT: Duration = Duration::from_secs(30);

/// Mail Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("mail-service"));

    let config = MailServiceConfig::from_env()?;

    tracing::info!(
        "Mail Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let registry = build_registry(&config.notification).await;
    if registry.get_available().is_empty() {
        tracing::warn!("送信プロバイダが設定されていません。送信はすべて失敗します");
    }
    for capability in registry.get_available() {
        tracing::info!(
            provider = %capability.name,
            role = %capability.role,
            supports_attachments = capability.supports_attachments,
            "送信プロバイダを登録しました"
        );
    }

    let history: Arc<dyn EmailHistoryRepository> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("データベースに接続しました");
            Arc::new(PostgresEmailHistoryRepository::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL が未設定のため、送信履歴はログにのみ出力します");
            Arc::new(NoopEmailHistoryRepository)
        }
    };

    let attachments = config
        .pdf_service_url
        .as_deref()
        .map(|url| {
            HttpPdfGenerator::new(url, PDF_TIMEOUT)
                .map(|generator| Arc::new(generator) as Arc<dyn AttachmentGenerator>)
        })
        .transpose()?;

    let service = SendEmailService::new(
        DeliveryOrchestrator::new(Arc::new(registry), config.notification.attempt_timeout),
        TemplateRenderer::new()?,
        history,
        attachments,
        Arc::new(SystemClock),
        SendEmailSettings {
            base_url:             config.base_url.clone(),
            follow_up_delay_days: config.follow_up_delay_days,
        },
    );
    let app = router(Arc::new(EmailState { service }));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Mail Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// 設定の有無から送信プロバイダを組み立てる
///
/// - `SMTP_HOST` があれば Server（SMTP）
/// - `NOTIFICATION_BACKEND=noop` なら Secondary は Noop、そうでなければ `SES_REGION` で SES
async fn build_registry(config: &NotificationConfig) -> ProviderRegistry {
    let server: Option<Arc<dyn NotificationSender>> = config.smtp.as_ref().map(|smtp| {
        let credentials = match (&smtp.username, &smtp.password) {
            (Some(username), Some(password)) => Some(SmtpCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        Arc::new(SmtpNotificationSender::new(
            &smtp.host,
            smtp.port,
            credentials,
            config.from_address.clone(),
        )) as Arc<dyn NotificationSender>
    });

    let secondary: Option<Arc<dyn NotificationSender>> = if config.uses_noop() {
        Some(Arc::new(NoopNotificationSender))
    } else {
        match &config.ses_region {
            Some(region) => Some(Arc::new(
                SesNotificationSender::from_region(region.clone(), config.from_address.clone())
                    .await,
            )),
            None => None,
        }
    };

    ProviderRegistry::new(server, secondary)
}
