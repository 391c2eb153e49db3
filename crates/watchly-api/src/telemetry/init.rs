use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use watchly_core::Config;

const DEFAULT_FILTER: &str = "watchly=debug,tower_http=debug,sqlx=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// `LOG_FORMAT` wins when set; otherwise production logs JSON and everything else
/// logs compact text.
fn use_json(log_format: Option<&str>, is_production: bool) -> bool {
    match log_format {
        Some(format) => format.eq_ignore_ascii_case("json"),
        None => is_production,
    }
}

/// Install the global tracing subscriber.
///
/// Console output is compact without target or time; JSON output is one object per
/// line for log shippers.
pub fn init_telemetry(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let log_format = std::env::var("LOG_FORMAT").ok();
    let json = use_json(log_format.as_deref(), config.is_production());

    if json {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        tracing_subscriber::registry()
            .with(env_filter())
            .with(console_fmt)
            .try_init()?;
    }

    tracing::info!(
        environment = config.environment(),
        json = json,
        "Tracing initialized"
    );
    Ok(())
}
