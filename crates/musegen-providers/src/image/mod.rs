//! Image providers. Both are synchronous: one POST, then an optional download.

use std::time::Duration;

pub mod nano_banana;
pub mod seedream;

pub use nano_banana::NanoBananaProvider;
pub use seedream::SeedreamProvider;

/// Per-request timeout for the generation POST.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
