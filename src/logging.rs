use crate::config::AppConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` wins over `LOG_LEVEL` when set.
///
/// Production emits one JSON object per line, every other environment the
/// human-readable format.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "tasas_backend={},collect={},sqlx=warn,tower_http=info",
            config.log_level, config.log_level
        )
        .into()
    });

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
