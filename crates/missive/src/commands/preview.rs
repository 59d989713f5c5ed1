//! Preview server command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use missive_server::{PreviewConfig, PreviewServer};

use crate::config;

/// Run the preview server.
pub async fn run(config_path: &Path, port: u16, open: bool) -> Result<()> {
    tracing::info!("Starting preview server on port {}", port);

    let file_config = config::load_config(config_path)?;

    let server_config = PreviewConfig {
        templates_dir: Some(PathBuf::from(&file_config.templates.dir)),
        port,
        open,
        ..Default::default()
    };

    PreviewServer::new(server_config).start().await?;

    Ok(())
}
