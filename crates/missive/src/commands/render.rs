//! Render a single template.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::commands::parse_props;
use crate::config;

/// Run the render command.
pub fn run(
    config_path: &Path,
    template_id: &str,
    props_file: Option<PathBuf>,
    prop_args: &[String],
    locale: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let file_config = config::load_config(config_path)?;
    let registry = config::build_registry(&file_config)?;

    let mut props: HashMap<String, String> = match props_file {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => HashMap::new(),
    };
    props.extend(parse_props(prop_args)?);

    let html = match locale {
        Some(locale) => registry.render_localized(template_id, &locale, &props)?,
        None => registry.render(template_id, &props)?,
    };

    match out {
        Some(path) => {
            fs::write(&path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => print!("{html}"),
    }

    Ok(())
}
