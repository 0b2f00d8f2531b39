//! # tessel-core
//!
//! Ambient runtime pieces shared by the Tessel data crates:
//!
//! - [`config`]: layered configuration (`application.yaml`, profile overrides,
//!   `.env` files, environment variables) with typed sections.
//! - [`logging`]: `tracing` subscriber initialisation.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, TesselConfig};
pub use logging::{init_tracing, init_tracing_with, LogFormat};
