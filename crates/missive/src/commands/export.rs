//! Export preview renders for every template with sample props.

use std::path::{Path, PathBuf};

use anyhow::Result;

use missive_template::export_previews;

use crate::config;

/// Run the export command.
pub fn run(config_path: &Path, out: Option<PathBuf>) -> Result<()> {
    tracing::info!("Exporting template previews...");

    let file_config = config::load_config(config_path)?;
    let registry = config::build_registry(&file_config)?;

    let out = out.unwrap_or_else(|| PathBuf::from(&file_config.export.out));
    let result = export_previews(&registry, &out)?;

    tracing::info!(
        "Exported {} previews ({} skipped) in {}ms",
        result.written,
        result.skipped,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
