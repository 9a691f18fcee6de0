//! Text (LLM) providers.

use std::time::Duration;

use crate::error::{ProviderError, Result};
use crate::traits::TextOptions;

pub mod chat_completions;
pub mod gemini;

pub use chat_completions::ChatCompletionsProvider;
pub use gemini::GeminiProvider;

/// Per-request timeout for text generation.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Checks shared by every text vendor.
pub(crate) fn validate_text_options(options: &TextOptions) -> Result<()> {
    if !(0.0..=2.0).contains(&options.temperature) {
        return Err(ProviderError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            options.temperature
        )));
    }
    if options.max_tokens == 0 {
        return Err(ProviderError::Validation("max_tokens must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_options() {
        assert!(validate_text_options(&TextOptions::default()).is_ok());

        let hot = TextOptions {
            temperature: 2.5,
            ..Default::default()
        };
        assert!(validate_text_options(&hot).is_err());

        let nan = TextOptions {
            temperature: f64::NAN,
            ..Default::default()
        };
        assert!(validate_text_options(&nan).is_err());

        let empty = TextOptions {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(validate_text_options(&empty).is_err());
    }
}
