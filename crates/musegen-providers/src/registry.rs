//! Vendor registry: static specs for every supported vendor.
//!
//! Each `VendorSpec` describes how to reach one vendor: display name,
//! modality, default API base and default model. Config values always win
//! over these defaults.

use musegen_core::config::ProviderConfig;

/// Output modality of a vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
    Video,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Static specification describing one vendor.
#[derive(Clone, Debug)]
pub struct VendorSpec {
    /// Internal name, matching the config key (e.g. `"nano_banana"`).
    pub name: &'static str,
    /// Human-readable name for logs. E.g. `"302.AI Kling"`.
    pub display_name: &'static str,
    /// What the vendor produces.
    pub modality: Modality,
    /// API base URL used when the config has none.
    pub default_api_base: &'static str,
    /// Model used when neither the config nor the call names one.
    pub default_model: &'static str,
    /// Vendor-native API key variable.
    pub env_key: &'static str,
    /// Vendor-native model variable.
    pub env_model: &'static str,
    /// Whether an empty key falls back to the 302.AI key.
    pub shares_aggregator_key: bool,
}

impl VendorSpec {
    /// API base for this vendor: config > default, without trailing slash.
    pub fn api_base(&self, config: &ProviderConfig) -> String {
        config
            .api_base
            .as_deref()
            .unwrap_or(self.default_api_base)
            .trim_end_matches('/')
            .to_string()
    }

    /// Default model for this vendor: config > spec default.
    pub fn model(&self, config: &ProviderConfig) -> String {
        config
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.to_string())
    }
}

pub static ZHIPU: VendorSpec = VendorSpec {
    name: "zhipu",
    display_name: "Zhipu GLM",
    modality: Modality::Text,
    default_api_base: "https://open.bigmodel.cn/api/paas/v4",
    default_model: "glm-4.7-flash",
    env_key: "ZHIPU_API_KEY",
    env_model: "ZHIPU_MODEL_NAME",
    shares_aggregator_key: false,
};

pub static GEMINI: VendorSpec = VendorSpec {
    name: "gemini",
    display_name: "Google Gemini",
    modality: Modality::Text,
    default_api_base: "https://generativelanguage.googleapis.com/v1beta",
    default_model: "gemini-2.5-flash",
    env_key: "GEMINI_API_KEY",
    env_model: "GEMINI_MODEL_NAME",
    shares_aggregator_key: false,
};

pub static THIRTYTWO: VendorSpec = VendorSpec {
    name: "thirtytwo",
    display_name: "302.AI",
    modality: Modality::Text,
    default_api_base: "https://api.302.ai/v1",
    default_model: "gemini-2.5-flash",
    env_key: "THIRTYTWO_API_KEY",
    env_model: "THIRTYTWO_MODEL_NAME",
    shares_aggregator_key: false,
};

pub static NANO_BANANA: VendorSpec = VendorSpec {
    name: "nano_banana",
    display_name: "302.AI Nano-Banana",
    modality: Modality::Image,
    default_api_base: "https://api.302.ai",
    default_model: "google/nano-banana-2",
    env_key: "THIRTYTWO_GEMINI_IMAGE_API_KEY",
    env_model: "THIRTYTWO_IMAGE_MODEL",
    shares_aggregator_key: true,
};

pub static SEEDREAM: VendorSpec = VendorSpec {
    name: "seedream",
    display_name: "302.AI Doubao Seedream",
    modality: Modality::Image,
    default_api_base: "https://api.302.ai",
    default_model: "doubao-seedream-5-0-260128",
    env_key: "THIRTYTWO_DOUBAO_API_KEY",
    env_model: "THIRTYTWO_DOUBAO_MODEL",
    shares_aggregator_key: true,
};

pub static KLING: VendorSpec = VendorSpec {
    name: "kling",
    display_name: "302.AI Kling",
    modality: Modality::Video,
    default_api_base: "https://api.302.ai",
    default_model: "kling-v2-5-turbo",
    env_key: "THIRTYTWO_KLING_API_KEY",
    env_model: "THIRTYTWO_VIDEO_MODEL",
    shares_aggregator_key: true,
};

/// Every supported vendor, text first.
pub static VENDORS: &[&VendorSpec] = &[&ZHIPU, &GEMINI, &THIRTYTWO, &NANO_BANANA, &SEEDREAM, &KLING];

/// Find a vendor spec by internal name. Dashes are accepted for
/// underscores, so `"nano-banana"` works from the command line.
pub fn find_by_name(name: &str) -> Option<&'static VendorSpec> {
    let normalized = name.to_lowercase().replace('-', "_");
    VENDORS.iter().copied().find(|spec| spec.name == normalized)
}

/// All vendors producing the given modality.
pub fn by_modality(modality: Modality) -> impl Iterator<Item = &'static VendorSpec> {
    VENDORS
        .iter()
        .copied()
        .filter(move |spec| spec.modality == modality)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
