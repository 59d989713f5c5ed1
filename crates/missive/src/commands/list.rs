//! List registered templates.

use std::path::Path;

use anyhow::Result;

use crate::config;

/// Run the list command.
pub fn run(config_path: &Path) -> Result<()> {
    let file_config = config::load_config(config_path)?;
    let registry = config::build_registry(&file_config)?;

    for id in registry.ids() {
        let template = registry.get(id);
        let description = template.and_then(|t| t.description()).unwrap_or("");
        let slots = template
            .map(|t| t.required_slots().join(", "))
            .unwrap_or_default();

        if slots.is_empty() {
            println!("{id:<24} {description}");
        } else {
            println!("{id:<24} {description} (requires: {slots})");
        }
    }

    Ok(())
}
