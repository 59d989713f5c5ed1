//! SMTP health probe.

use std::path::Path;

use anyhow::{Context, Result};

use missive_delivery::check_connection;

use crate::config;

/// Run the check command.
pub async fn run(config_path: &Path) -> Result<()> {
    let file_config = config::load_config(config_path)?;

    let smtp = file_config
        .smtp
        .as_ref()
        .context("No [smtp] section in missive.toml")?;
    let smtp_config = smtp.to_smtp_config()?;

    tracing::info!("Probing {}:{}...", smtp_config.host, smtp_config.port);

    check_connection(&smtp_config)
        .await
        .context("SMTP connection check failed")?;

    tracing::info!("SMTP connection OK");

    Ok(())
}
