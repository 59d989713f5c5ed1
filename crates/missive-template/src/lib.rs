//! Static HTML email template renderer.
//!
//! Templates are fixed HTML documents with named `{{slot}}` insertion points.
//! Rendering substitutes caller-supplied props into the slots, HTML-escaping
//! every value, and returns the finished document string. Rendering is pure
//! and synchronous; template lookup goes through an explicit [`Registry`]
//! passed by reference, never through global state.

pub mod escape;
pub mod export;
pub mod frontmatter;
pub mod loader;
pub mod registry;
pub mod template;

pub use escape::escape_html;
pub use export::{export_previews, ExportError, ExportResult};
pub use frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
pub use loader::{load_dir, LoadError};
pub use registry::Registry;
pub use template::{CompileError, RenderError, Template};
