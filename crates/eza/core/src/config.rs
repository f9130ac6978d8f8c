//! Layered configuration
//!
//! Defaults, then an optional file, then `EZA__*` environment variables.
//! Nested keys use `__`, e.g. `EZA__TELEMETRY__RECONNECT_DELAY_MS=5000`.

use eza_analytics::AggregationConfig;
use eza_client::OrchestratorConfig;
use eza_normalize::NormalizeOptions;
use eza_stage::StageConfig;
use eza_telemetry::TelemetryConfig;
use eza_types::{EzaError, EzaResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "EZA";
pub const ENV_SEPARATOR: &str = "__";

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EzaConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub stage: StageConfig,

    #[serde(default)]
    pub normalize: NormalizeOptions,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// JSON-lines audit file. The audit trail is kept in memory when unset.
    #[serde(default)]
    pub audit_path: Option<PathBuf>,
}

impl EzaConfig {
    /// Load configuration. A given `path` must exist; its format follows
    /// the file extension.
    pub fn load(path: Option<&Path>) -> EzaResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&EzaConfig::default()).map_err(config_error)?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: EzaConfig = builder
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EzaResult<()> {
        let orchestrator = &self.orchestrator;
        if orchestrator.base_url.trim().is_empty() {
            return Err(invalid("orchestrator.base_url must not be empty"));
        }
        if orchestrator.request_timeout_ms == 0 {
            return Err(invalid("orchestrator.request_timeout_ms must be positive"));
        }

        let telemetry = &self.telemetry;
        if telemetry.stream_url.trim().is_empty() {
            return Err(invalid("telemetry.stream_url must not be empty"));
        }
        if telemetry.reconnect_delay_ms == 0 {
            return Err(invalid("telemetry.reconnect_delay_ms must be positive"));
        }
        if !telemetry.alert_threshold.is_finite() {
            return Err(invalid("telemetry.alert_threshold must be a finite number"));
        }

        if self.stage.completed_id_memory == 0 {
            return Err(invalid("stage.completed_id_memory must be positive"));
        }

        let aggregation = &self.aggregation;
        if !aggregation.thresholds_ordered() {
            return Err(EzaError::Config(format!(
                "aggregation.high_below ({}) must not exceed aggregation.low_from ({})",
                aggregation.high_below, aggregation.low_from
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> EzaError {
    EzaError::Config(message.to_string())
}

fn config_error(err: config::ConfigError) -> EzaError {
    EzaError::Config(err.to_string())
}
