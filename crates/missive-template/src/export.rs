//! Preview export: render every previewable template to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::registry::Registry;

/// Result of an export run.
#[derive(Debug)]
pub struct ExportResult {
    /// Number of templates rendered and written
    pub written: usize,

    /// Templates skipped because they carry no sample props
    pub skipped: usize,

    /// Total export time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to render {id}: {message}")]
    Render { id: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Render every template with sample props into `<out>/<id>.html`.
///
/// Templates without sample props are skipped; renders run in parallel.
pub fn export_previews(registry: &Registry, out: &Path) -> Result<ExportResult, ExportError> {
    let start = Instant::now();

    fs::create_dir_all(out).map_err(|e| ExportError::Write {
        path: out.display().to_string(),
        message: e.to_string(),
    })?;

    let previewable: Vec<_> = registry
        .iter()
        .filter(|t| t.sample_props().is_some())
        .collect();
    let skipped = registry.len() - previewable.len();

    let results: Vec<Result<(), ExportError>> = previewable
        .par_iter()
        .map(|template| {
            let props = template.sample_props().cloned().unwrap_or_default();
            let html = template.render(&props).map_err(|e| ExportError::Render {
                id: template.id().to_string(),
                message: e.to_string(),
            })?;

            let path = out.join(format!("{}.html", template.id()));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| ExportError::Write {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
            }
            fs::write(&path, html).map_err(|e| ExportError::Write {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            tracing::debug!("Exported {}", path.display());
            Ok(())
        })
        .collect();

    for result in results {
        result?;
    }

    Ok(ExportResult {
        written: previewable.len(),
        skipped,
        duration_ms: start.elapsed().as_millis() as u64,
        output_dir: out.to_path_buf(),
    })
}
