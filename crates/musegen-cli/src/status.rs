//! `musegen status`: show configuration and vendor status.

use anyhow::Result;
use colored::Colorize;

use musegen_core::config::{get_config_path, Config};
use musegen_providers::registry::{by_modality, Modality};

/// Run the status command.
pub fn run(config: &Config) -> Result<()> {
    let config_path = get_config_path();

    println!();
    println!("{}", "Musegen Status".cyan().bold());
    println!();

    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, run `musegen onboard`)".red().to_string()
        }
    );

    let log_dir = musegen_core::utils::expand_home(&config.logging.log_dir);
    println!(
        "  {:<14} {} {}",
        "Logs:".bold(),
        log_dir.display(),
        if config.logging.debug {
            "(debug)".yellow().to_string()
        } else {
            String::new()
        }
    );

    println!(
        "  {:<14} every {}s, give up after {}s",
        "Video polls:".bold(),
        config.video.poll_interval_secs,
        config.video.max_polling_secs
    );

    for modality in [Modality::Text, Modality::Image, Modality::Video] {
        println!();
        println!("  {}", format!("{modality} vendors:").bold());

        for spec in by_modality(modality) {
            let own = config.providers.get_by_name(spec.name);
            let resolved = config.providers.resolve(spec.name).unwrap_or_default();

            let key_status = if own.is_some_and(|c| c.is_configured()) {
                format!("{} (key set)", "✓".green())
            } else if spec.shares_aggregator_key && resolved.is_configured() {
                format!("{} (302.AI key)", "✓".green())
            } else {
                format!("{} [{}]", "· not configured".dimmed(), spec.env_key.dimmed())
            };

            println!(
                "    {:<24} {:<28} {}",
                spec.display_name,
                spec.model(&resolved).dimmed(),
                key_status
            );
        }
    }

    println!();
    Ok(())
}
