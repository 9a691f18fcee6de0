//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProvidersConfig`, `VideoConfig`, `LoggingConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

/// Vendors served through the 302.AI aggregator. When their own key is
/// empty they borrow the `thirtytwo` key.
pub const AGGREGATOR_HOSTED: &[&str] = &["nano_banana", "seedream", "kling"];

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.musegen/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single vendor (API key, base URL, model).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the vendor default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model identifier (overrides the vendor default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All vendor configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    /// Zhipu GLM (text).
    #[serde(default)]
    pub zhipu: ProviderConfig,
    /// Google Gemini (text).
    #[serde(default)]
    pub gemini: ProviderConfig,
    /// 302.AI aggregator (text). Its key doubles as the fallback key for
    /// every aggregator-hosted vendor.
    #[serde(default)]
    pub thirtytwo: ProviderConfig,
    /// 302.AI Google Nano-Banana (image).
    #[serde(default)]
    pub nano_banana: ProviderConfig,
    /// 302.AI Doubao Seedream (image).
    #[serde(default)]
    pub seedream: ProviderConfig,
    /// 302.AI Kling (video).
    #[serde(default)]
    pub kling: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by name (e.g. `"kling"`), exactly as stored.
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "zhipu" => Some(&self.zhipu),
            "gemini" => Some(&self.gemini),
            "thirtytwo" => Some(&self.thirtytwo),
            "nano_banana" => Some(&self.nano_banana),
            "seedream" => Some(&self.seedream),
            "kling" => Some(&self.kling),
            _ => None,
        }
    }

    /// Mutable access by name, used by the env override pass.
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ProviderConfig> {
        match name {
            "zhipu" => Some(&mut self.zhipu),
            "gemini" => Some(&mut self.gemini),
            "thirtytwo" => Some(&mut self.thirtytwo),
            "nano_banana" => Some(&mut self.nano_banana),
            "seedream" => Some(&mut self.seedream),
            "kling" => Some(&mut self.kling),
            _ => None,
        }
    }

    /// The effective config for a vendor: its own entry, with the 302.AI
    /// key filled in for aggregator-hosted vendors that have none.
    pub fn resolve(&self, name: &str) -> Option<ProviderConfig> {
        let mut config = self.get_by_name(name)?.clone();
        if !config.is_configured() && AGGREGATOR_HOSTED.contains(&name) {
            config.api_key = self.thirtytwo.api_key.clone();
        }
        Some(config)
    }
}

// ─────────────────────────────────────────────
// Video polling
// ─────────────────────────────────────────────

/// Polling policy for asynchronous video tasks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoConfig {
    /// Fixed sleep between two status polls.
    pub poll_interval_secs: u64,
    /// Total time budget measured from submission.
    pub max_polling_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_polling_secs: 300,
        }
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

/// Console + file logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Print debug-level events on the console (the file always gets them).
    pub debug: bool,
    /// Directory for the daily log files.
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_dir: "~/.musegen/logs".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
