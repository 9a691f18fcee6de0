//! Vendor clients for Musegen.
//!
//! # Architecture
//!
//! - [`traits`]: one capability trait per modality ([`TextProvider`],
//!   [`ImageProvider`], [`VideoProvider`])
//! - [`registry`]: static specs for every supported vendor
//! - [`llm`]: OpenAI-compatible and native Gemini text clients
//! - [`image`]: synchronous image clients
//! - [`video`]: the asynchronous task lifecycle and the Kling client
//! - [`error`]: the shared [`ProviderError`] taxonomy

pub mod error;
mod http;
pub mod image;
pub mod llm;
pub mod registry;
pub mod traits;
pub mod video;

// Re-export main types for convenience
pub use error::{ErrorKind, ProviderError, Result};
pub use image::{NanoBananaProvider, SeedreamProvider};
pub use llm::{ChatCompletionsProvider, GeminiProvider};
pub use registry::{find_by_name, Modality, VendorSpec, VENDORS};
pub use traits::{
    ImageOptions, ImageProvider, TextOptions, TextProvider, ThinkingLevel, VideoOptions,
    VideoProvider,
};
pub use video::{KlingVideoProvider, PollPolicy, TaskHandle, TaskModality, TaskSnapshot, TaskStatus};
