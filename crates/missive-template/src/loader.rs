//! Loading templates from a directory of `.html` files.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::frontmatter::extract_frontmatter;
use crate::registry::Registry;
use crate::template::Template;

/// Errors that can occur while loading a template directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Template directory not found: {0}")]
    DirNotFound(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid frontmatter in {path}: {message}")]
    Frontmatter { path: String, message: String },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },
}

/// Load every `.html` file under `dir` as a template.
///
/// The template id is the file's path relative to `dir`, `/`-separated, with
/// the extension removed: `team/invite.html` becomes `team/invite`, and the
/// locale convention `welcome.tr.html` becomes `welcome.tr`. Files may start
/// with a `---` YAML frontmatter block carrying a subject line, a
/// description, and sample props.
pub fn load_dir(dir: &Path) -> Result<Vec<Template>, LoadError> {
    if !dir.exists() {
        return Err(LoadError::DirNotFound(dir.display().to_string()));
    }

    let mut templates = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "html" {
            continue;
        }

        let source = fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let (frontmatter, body) =
            extract_frontmatter(&source).map_err(|e| LoadError::Frontmatter {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let id = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let mut template = Template::compile(&id, body).map_err(|e| LoadError::Compile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(fm) = frontmatter {
            if let Some(subject) = &fm.subject {
                template = template
                    .with_subject(subject)
                    .map_err(|e| LoadError::Compile {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
            }
            if let Some(description) = fm.description {
                template = template.with_description(description);
            }
            if !fm.sample.is_empty() {
                template = template.with_sample_props(fm.sample);
            }
        }

        tracing::debug!("Loaded template '{}' from {}", id, path.display());
        templates.push(template);
    }

    Ok(templates)
}

impl Registry {
    /// Load a template directory into this registry.
    ///
    /// Returns the number of templates loaded. Loaded templates replace
    /// built-ins with the same id.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, LoadError> {
        let templates = load_dir(dir)?;
        let count = templates.len();
        for template in templates {
            self.add(template);
        }
        Ok(count)
    }
}
