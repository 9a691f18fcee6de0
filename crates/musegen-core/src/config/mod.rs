//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use musegen_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Kling model: {:?}", cfg.providers.kling.model);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config, NATIVE_ENV_VARS};
pub use schema::{Config, AGGREGATOR_HOSTED, LoggingConfig, ProviderConfig, ProvidersConfig, VideoConfig};
