//! EZA Core - configuration, tracing and runtime wiring
//!
//! One entry point for presentation code:
//!
//! ```no_run
//! use eza_core::{init_tracing, EzaConfig, EzaRuntime};
//! use eza_types::AnalysisMode;
//!
//! # async fn run() -> eza_types::EzaResult<()> {
//! let config = EzaConfig::load(None)?;
//! init_tracing(&config.logging)?;
//!
//! let runtime = EzaRuntime::new(config).await?;
//! let result = runtime
//!     .submit("Only 2 left, buy now!", AnalysisMode::Fast)
//!     .completed()
//!     .await;
//! println!("{:?} {}", result.overall_score, result.risk_level);
//!
//! let snapshot = runtime.dashboard_snapshot().await?;
//! println!("{} analyses, {} high risk", snapshot.total, snapshot.bands.high);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{EzaConfig, LoggingConfig, ENV_PREFIX, ENV_SEPARATOR};
pub use logging::init_tracing;
pub use runtime::EzaRuntime;
