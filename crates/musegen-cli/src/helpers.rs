//! Shared CLI helpers: output files, `--extra` parsing, printing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use musegen_core::utils::expand_home;
use serde_json::Value;

/// Write generated bytes, creating parent directories. Returns the final path.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let path = expand_home(&path.to_string_lossy());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Parse `KEY=VALUE`; VALUE is JSON when it parses, otherwise a string.
pub fn parse_extra(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Print generated text to stdout.
pub fn print_response(vendor: &str, response: &str) {
    println!();
    println!("{}", vendor.cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Report a saved artifact.
pub fn print_saved(kind: &str, path: &Path, bytes: usize) {
    println!(
        "  {} {} saved to {} {}",
        "✓".green(),
        kind,
        path.display(),
        format!("({bytes} bytes)").dimmed()
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
