//! Musegen CLI: entry point.
//!
//! # Commands
//!
//! - `musegen text -p PROMPT`: generate text with an LLM vendor
//! - `musegen image -p PROMPT -o FILE`: generate an image
//! - `musegen video -p PROMPT -o FILE`: generate a video (or just submit it)
//! - `musegen video-status --task-id ID --modality M`: check a submitted video task
//! - `musegen status`: show configuration and vendor status
//! - `musegen onboard`: write the default config file

mod generate;
mod helpers;
mod onboard;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use musegen_core::config::{load_config, Config};
use musegen_core::logging::init_logging;
use musegen_providers::{TaskModality, ThinkingLevel};

use generate::{ImageVendor, TextVendor};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Musegen: one CLI for text, image and video generation vendors
#[derive(Parser)]
#[command(name = "musegen", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on the console
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate text from a prompt
    Text {
        /// Prompt text
        #[arg(short, long)]
        prompt: String,

        /// Vendor to call
        #[arg(long, value_enum, default_value_t = TextVendor::Thirtytwo)]
        vendor: TextVendor,

        /// Request extended reasoning (minimal, low, medium, high)
        #[arg(long, num_args = 0..=1, default_missing_value = "high")]
        thinking: Option<ThinkingLevel>,

        /// Stream the answer (OpenAI-compatible vendors)
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Sampling temperature (0.0 to 2.0)
        #[arg(long, default_value_t = 1.0)]
        temperature: f64,

        /// Maximum tokens to generate
        #[arg(long, default_value_t = 65536)]
        max_tokens: u32,
    },

    /// Generate an image from a prompt and optional reference images
    Image {
        /// Prompt text
        #[arg(short, long)]
        prompt: String,

        /// Vendor to call
        #[arg(long, value_enum, default_value_t = ImageVendor::NanoBanana)]
        vendor: ImageVendor,

        /// Reference image URL (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,

        /// Aspect ratio, e.g. 16:9
        #[arg(long)]
        aspect_ratio: Option<String>,

        /// Resolution tier (1k, 2k, 4k)
        #[arg(long)]
        resolution: Option<String>,

        /// Response format (url, b64_json)
        #[arg(long, value_parser = ["url", "b64_json"])]
        format: Option<String>,

        /// Vendor-specific field as KEY=VALUE (VALUE parsed as JSON when possible)
        #[arg(long = "extra", value_parser = helpers::parse_extra)]
        extras: Vec<(String, serde_json::Value)>,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a video from a prompt and optional reference images
    Video {
        /// Prompt text
        #[arg(short, long)]
        prompt: String,

        /// Reference image URL (repeatable); switches to image-to-video
        #[arg(long = "image")]
        images: Vec<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Generation mode (std, pro)
        #[arg(long)]
        mode: Option<String>,

        /// Aspect ratio (16:9, 9:16, 1:1)
        #[arg(long)]
        aspect_ratio: Option<String>,

        /// Clip length in seconds (5, 10)
        #[arg(long)]
        duration: Option<u32>,

        /// Vendor-specific field as KEY=VALUE (VALUE parsed as JSON when possible)
        #[arg(long = "extra", value_parser = helpers::parse_extra)]
        extras: Vec<(String, serde_json::Value)>,

        /// Submit only and print the task handle
        #[arg(long, default_value_t = false)]
        no_wait: bool,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a previously submitted video task once
    VideoStatus {
        /// Task id returned at submission
        #[arg(long)]
        task_id: String,

        /// Endpoint the task was submitted to (text2video, image2video)
        #[arg(long, default_value = "text2video")]
        modality: TaskModality,
    },

    /// Show configuration and vendor status
    Status,

    /// Write the default configuration file
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(None);
    // flushes the log file on drop
    let _guard =
        init_logging(&config.logging, cli.logs).context("failed to initialize logging")?;

    dispatch(cli.command, &config).await
}

async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Text {
            prompt,
            vendor,
            thinking,
            stream,
            temperature,
            max_tokens,
        } => {
            let options = musegen_providers::TextOptions {
                temperature,
                max_tokens,
                thinking,
                stream,
            };
            generate::run_text(config, vendor, &prompt, &options).await
        }
        Commands::Image {
            prompt,
            vendor,
            images,
            aspect_ratio,
            resolution,
            format,
            extras,
            output,
        } => {
            let options = musegen_providers::ImageOptions {
                reference_images: images,
                aspect_ratio,
                resolution,
                response_format: format,
                extra: extras.into_iter().collect(),
                ..Default::default()
            };
            generate::run_image(config, vendor, &prompt, &options, output).await
        }
        Commands::Video {
            prompt,
            images,
            model,
            mode,
            aspect_ratio,
            duration,
            extras,
            no_wait,
            output,
        } => {
            let options = musegen_providers::VideoOptions {
                reference_images: images,
                model,
                mode,
                aspect_ratio,
                duration_secs: duration,
                extra: extras.into_iter().collect(),
            };
            if no_wait {
                generate::submit_video(config, &prompt, &options).await
            } else {
                generate::run_video(config, &prompt, &options, output).await
            }
        }
        Commands::VideoStatus { task_id, modality } => {
            generate::video_status(config, &task_id, modality).await
        }
        Commands::Status => status::run(config),
        Commands::Onboard => onboard::run(),
    }
}
