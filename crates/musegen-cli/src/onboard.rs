//! `musegen onboard`: create `~/.musegen/config.json` with defaults.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use musegen_core::config::{get_config_path, save_config, Config};

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "Musegen Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    let created = write_default_config(&config_path)?;
    if created {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let log_dir = musegen_core::utils::expand_home(&Config::default().logging.log_dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    println!("  {} log dir at {}", "✓".green(), log_dir.display());

    println!();
    println!(
        "{}",
        "  Add your API keys to the config (or export THIRTYTWO_API_KEY), then run `musegen status`."
            .green()
    );
    println!();
    Ok(())
}

/// Write the default config unless the file exists. True when written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    // defaults only; env values are not persisted
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
