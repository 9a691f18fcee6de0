//! Generation commands and the provider composition root.
//!
//! Providers are built here, once per command, from the loaded config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use tracing::info;

use musegen_core::config::Config;
use musegen_core::utils::timestamped_filename;
use musegen_providers::registry::{GEMINI, THIRTYTWO, ZHIPU};
use musegen_providers::{
    ChatCompletionsProvider, GeminiProvider, ImageOptions, ImageProvider, KlingVideoProvider,
    NanoBananaProvider, SeedreamProvider, TaskHandle, TaskModality, TaskStatus, TextOptions,
    TextProvider, VideoOptions, VideoProvider,
};

use crate::helpers;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TextVendor {
    Zhipu,
    Gemini,
    Thirtytwo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImageVendor {
    NanoBanana,
    Seedream,
}

// ─────────────────────────────────────────────
// Composition root
// ─────────────────────────────────────────────

pub fn text_provider(config: &Config, vendor: TextVendor) -> Box<dyn TextProvider> {
    let providers = &config.providers;
    match vendor {
        TextVendor::Zhipu => Box::new(ChatCompletionsProvider::new(&providers.zhipu, &ZHIPU)),
        TextVendor::Gemini => Box::new(GeminiProvider::new(&providers.gemini)),
        TextVendor::Thirtytwo => {
            Box::new(ChatCompletionsProvider::new(&providers.thirtytwo, &THIRTYTWO))
        }
    }
}

pub fn image_provider(config: &Config, vendor: ImageVendor) -> Box<dyn ImageProvider> {
    match vendor {
        ImageVendor::NanoBanana => Box::new(NanoBananaProvider::new(
            &config.providers.resolve("nano_banana").unwrap_or_default(),
        )),
        ImageVendor::Seedream => Box::new(SeedreamProvider::new(
            &config.providers.resolve("seedream").unwrap_or_default(),
        )),
    }
}

pub fn video_provider(config: &Config) -> KlingVideoProvider {
    KlingVideoProvider::new(
        &config.providers.resolve("kling").unwrap_or_default(),
        &config.video,
    )
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

pub async fn run_text(
    config: &Config,
    vendor: TextVendor,
    prompt: &str,
    options: &TextOptions,
) -> Result<()> {
    let provider = text_provider(config, vendor);
    let text = provider
        .generate(prompt, options)
        .await
        .with_context(|| format!("{} text generation failed", provider.display_name()))?;

    helpers::print_response(provider.display_name(), &text);
    Ok(())
}

pub async fn run_image(
    config: &Config,
    vendor: ImageVendor,
    prompt: &str,
    options: &ImageOptions,
    output: Option<PathBuf>,
) -> Result<()> {
    let provider = image_provider(config, vendor);
    let bytes = provider
        .generate(prompt, options)
        .await
        .with_context(|| format!("{} image generation failed", provider.display_name()))?;

    let path = output.unwrap_or_else(|| PathBuf::from(timestamped_filename("image", "png")));
    let written = helpers::write_output(&path, &bytes)?;
    helpers::print_saved("image", &written, bytes.len());
    Ok(())
}

pub async fn run_video(
    config: &Config,
    prompt: &str,
    options: &VideoOptions,
    output: Option<PathBuf>,
) -> Result<()> {
    let provider = video_provider(config);
    let bytes = provider
        .generate(prompt, options)
        .await
        .with_context(|| format!("{} video generation failed", provider.display_name()))?;

    let path = output.unwrap_or_else(|| PathBuf::from(timestamped_filename("video", "mp4")));
    let written = helpers::write_output(&path, &bytes)?;
    helpers::print_saved("video", &written, bytes.len());
    Ok(())
}

/// Submit without waiting and print the handle for a later `video-status`.
pub async fn submit_video(config: &Config, prompt: &str, options: &VideoOptions) -> Result<()> {
    let provider = video_provider(config);
    let handle = provider
        .submit(prompt, options)
        .await
        .context("video submission failed")?;
    info!(task_id = %handle.task_id, "task submitted without waiting");

    println!("{}", serde_json::to_string_pretty(&handle)?);
    println!(
        "{}",
        format!(
            "Check later with: musegen video-status --task-id {} --modality {}",
            handle.task_id, handle.modality
        )
        .dimmed()
    );
    Ok(())
}

pub async fn video_status(config: &Config, task_id: &str, modality: TaskModality) -> Result<()> {
    let provider = video_provider(config);
    let handle = TaskHandle::new(task_id, modality);
    let snapshot = provider
        .fetch_task(&handle)
        .await
        .with_context(|| format!("failed to fetch task {task_id}"))?;

    let status = snapshot.handle.status;
    let label = match status {
        TaskStatus::Succeeded => status.as_str().green(),
        TaskStatus::Failed => status.as_str().red(),
        _ => status.as_str().yellow(),
    };
    println!("  {:<10} {}", "Task:".bold(), snapshot.handle.task_id);
    println!("  {:<10} {}", "Status:".bold(), label);
    if let Some(url) = &snapshot.result_url {
        println!("  {:<10} {}", "Video:".bold(), url);
    }
    if let Some(message) = &snapshot.error_message {
        println!("  {:<10} {}", "Error:".bold(), message.red());
    }
    Ok(())
}
