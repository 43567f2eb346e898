//! ログ出力の初期化

use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::adapter::config::{AppConfig, LogFormat};

/// ログ初期化エラー
#[derive(Debug, thiserror::Error)]
#[error("Failed to initialise logging: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// tracingのサブスクライバーを初期化する
/// `RUST_LOG`が設定されていればLOG_LEVELより優先する
pub fn init_subscriber(config: &AppConfig) -> Result<(), LoggingError> {
    match config.log_format {
        LogFormat::Compact => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_line_number(true),
        ),
        LogFormat::Json => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
        ),
    }
}

fn build_env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},sqlx=warn,hyper=warn,tower_http=info",
            log_level
        ))
    })
}

fn init_with_layer<L>(config: &AppConfig, fmt_layer: L) -> Result<(), LoggingError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(&config.log_level))
        .try_init()?;

    Ok(())
}
