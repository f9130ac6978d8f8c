//! Tracing subscriber setup

use crate::config::LoggingConfig;
use eza_types::{EzaError, EzaResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the configured
/// level. Fails rather than panicking when a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> EzaResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            EzaError::Config(format!("invalid log level '{}': {}", config.level, err))
        })?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let installed = if config.json {
        subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        subscriber.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|err| EzaError::Config(format!("tracing already initialised: {}", err)))
}
