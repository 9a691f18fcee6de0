//! Error taxonomy shared by every provider.
//!
//! Callers care about one distinction above all: whether the vendor may have
//! started work (and may bill for it). [`ProviderError::never_started`]
//! answers that.

use std::time::Duration;

/// Boxed underlying cause of a remote failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No credential available for the vendor.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied option is outside the vendor's supported set.
    #[error("invalid option: {0}")]
    Validation(String),

    /// The vendor failed: non-2xx status, application-level error code,
    /// malformed success, or a transport failure.
    #[error("{}", remote_display(.status, .message))]
    Remote {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The poll budget ran out while the task was still in progress.
    #[error("task {task_id} still unfinished after {elapsed:?}")]
    Timeout { task_id: String, elapsed: Duration },
}

fn remote_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("remote error ({code}): {message}"),
        None => format!("remote error: {message}"),
    }
}

/// Coarse category of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Remote,
    Timeout,
}

impl ProviderError {
    /// A vendor-reported failure without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// A non-2xx HTTP response.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: body.into(),
            source: None,
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// True when the request never reached the vendor, so nothing can be
    /// running or billed remotely.
    pub fn never_started(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Validation(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: format!("HTTP error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Remote {
            status: None,
            message: format!("malformed response: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
