//! # Observability 基盤
//!
//! tracing subscriber の組み立てを 1 か所にまとめる。
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `LOG_FORMAT` | `json`（構造化ログ）または `pretty`。大文字小文字は区別しない |
//! | `RUST_LOG` | フィルタ。未設定なら [`DEFAULT_FILTER`] |

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,notifly=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 イベント 1 行の JSON（ログ基盤への取り込み用）
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// 既知の値だけを受け付ける
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_format:   LogFormat,
    /// `LOG_FORMAT` に未知の値が入っていた場合、その値
    ///
    /// subscriber の初期化前には記録できないため、初期化後に警告として出す。
    pub rejected_format: Option<String>,
}

impl TracingConfig {
    /// プロセスの環境変数から読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み取る（テスト用に環境変数を差し替えられる）
    pub fn from_lookup(
        service_name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let raw = lookup("LOG_FORMAT");
        let parsed = raw.as_deref().map(LogFormat::parse);
        Self {
            service_name:    service_name.into(),
            log_format:      parsed.flatten().unwrap_or_default(),
            rejected_format: raw.filter(|_| parsed == Some(None)),
        }
    }
}

/// グローバル subscriber を登録する
///
/// `ErrorLayer` も登録するので、`InfraError` の `SpanTrace` に呼び出し経路が残る。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    if let Some(value) = &config.rejected_format {
        tracing::warn!(log_format = %value, "未知の LOG_FORMAT のため pretty で出力する");
    }
    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "トレーシングを初期化しました"
    );
}
