//! Frontmatter extraction for template files.

use std::collections::HashMap;

use serde::Deserialize;

/// Parsed frontmatter from a template file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Frontmatter {
    /// Subject line, compiled with the same slot syntax as the body
    #[serde(default)]
    pub subject: Option<String>,

    /// Human-readable description shown in listings
    #[serde(default)]
    pub description: Option<String>,

    /// Sample props used for previews and exports
    #[serde(default)]
    pub sample: HashMap<String, String>,
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}

/// Extract frontmatter from template source.
///
/// Returns the parsed frontmatter and the remaining content after the
/// frontmatter block. Files without a leading `---` pass through untouched.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let frontmatter: Frontmatter = serde_yaml::from_str(yaml_content)
        .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    Ok((Some(frontmatter), remaining.trim_start()))
}
