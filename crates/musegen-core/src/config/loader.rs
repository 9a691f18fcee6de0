//! Config loader: reads `~/.musegen/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.musegen/config.json`
//! 3. Environment variables `MUSEGEN_<SECTION>__<FIELD>` (override JSON)
//! 4. Vendor-native variables such as `THIRTYTWO_KLING_API_KEY`, only for
//!    keys and models still empty after step 3

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Vendor-native environment variables: `(vendor, api key var, model var)`.
pub const NATIVE_ENV_VARS: &[(&str, &str, &str)] = &[
    ("zhipu", "ZHIPU_API_KEY", "ZHIPU_MODEL_NAME"),
    ("gemini", "GEMINI_API_KEY", "GEMINI_MODEL_NAME"),
    ("thirtytwo", "THIRTYTWO_API_KEY", "THIRTYTWO_MODEL_NAME"),
    ("nano_banana", "THIRTYTWO_GEMINI_IMAGE_API_KEY", "THIRTYTWO_IMAGE_MODEL"),
    ("seedream", "THIRTYTWO_DOUBAO_API_KEY", "THIRTYTWO_DOUBAO_MODEL"),
    ("kling", "THIRTYTWO_KLING_API_KEY", "THIRTYTWO_VIDEO_MODEL"),
];

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    apply_env_overrides(read_config_file(path))
}

/// Read and parse the JSON file, without touching the environment.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `MUSEGEN_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `MUSEGEN_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `MUSEGEN_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `MUSEGEN_PROVIDERS__<NAME>__MODEL` → `providers.<name>.model`
/// - `MUSEGEN_VIDEO__POLL_INTERVAL_SECS` → `video.poll_interval_secs`
/// - `MUSEGEN_VIDEO__MAX_POLLING_SECS` → `video.max_polling_secs`
/// - `MUSEGEN_LOGGING__DEBUG` / `DEBUG_MODE` → `logging.debug`
/// - `MUSEGEN_LOGGING__LOG_DIR` → `logging.log_dir`
fn apply_env_overrides(mut config: Config) -> Config {
    for (name, key_var, model_var) in NATIVE_ENV_VARS {
        let Some(provider) = config.providers.get_by_name_mut(name) else {
            continue;
        };
        let section = name.to_uppercase();
        apply_provider_env(provider, &section);
        apply_native_env(provider, key_var, model_var);
    }

    // Video polling
    if let Ok(val) = std::env::var("MUSEGEN_VIDEO__POLL_INTERVAL_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.video.poll_interval_secs = n;
        }
    }
    if let Ok(val) = std::env::var("MUSEGEN_VIDEO__MAX_POLLING_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.video.max_polling_secs = n;
        }
    }

    // Logging
    if let Ok(val) = std::env::var("MUSEGEN_LOGGING__DEBUG").or_else(|_| std::env::var("DEBUG_MODE")) {
        config.logging.debug = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("MUSEGEN_LOGGING__LOG_DIR") {
        config.logging.log_dir = val;
    }

    config
}

/// Apply `MUSEGEN_PROVIDERS__<NAME>__*` overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("MUSEGEN_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("MUSEGEN_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var(format!("MUSEGEN_PROVIDERS__{name}__MODEL")) {
        provider.model = Some(val);
    }
}

/// Fill empty key/model from the vendor's native variables.
fn apply_native_env(provider: &mut ProviderConfig, key_var: &str, model_var: &str) {
    if !provider.is_configured() {
        if let Ok(val) = std::env::var(key_var) {
            provider.api_key = val;
        }
    }
    if provider.model.is_none() {
        if let Ok(val) = std::env::var(model_var) {
            if !val.is_empty() {
                provider.model = Some(val);
            }
        }
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "on")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
