//! Compose a message from a template and deliver it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use missive_delivery::{FileTransport, SmtpTransport, Transport};
use missive_message::{Attachment, Message};

use crate::commands::parse_props;
use crate::config;

/// Run the send command.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    config_path: &Path,
    template_id: &str,
    to: Vec<String>,
    from: Option<String>,
    subject: Option<String>,
    prop_args: &[String],
    attach: Vec<PathBuf>,
    outbox: Option<PathBuf>,
) -> Result<()> {
    let file_config = config::load_config(config_path)?;
    let registry = config::build_registry(&file_config)?;
    let props = parse_props(prop_args)?;

    let template = registry
        .get(template_id)
        .ok_or_else(|| anyhow::anyhow!("Template not found: '{template_id}'"))?;
    let html = template.render(&props)?;

    let from = from
        .or_else(|| {
            file_config
                .smtp
                .as_ref()
                .and_then(|smtp| smtp.from.clone())
        })
        .context("No sender address: pass --from or set smtp.from in missive.toml")?;

    let subject = match subject {
        Some(s) => s,
        None => template
            .render_subject(&props)?
            .unwrap_or_else(|| "(no subject)".to_string()),
    };

    let mut message = Message::new();
    message
        .set_from(from)
        .set_subject(subject)
        .set_html_body(html);
    for addr in to {
        message.add_to(addr);
    }
    for path in attach {
        let data =
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("attachment")
            .to_string();
        let mime_type = mime_for_filename(&filename).to_string();
        message.add_attachment(Attachment {
            filename,
            data,
            mime_type,
        });
    }

    let envelope = message.build()?;

    if let Some(outbox) = outbox {
        FileTransport::new(outbox).send(&envelope).await?;
    } else {
        let smtp = file_config
            .smtp
            .as_ref()
            .context("No [smtp] section in missive.toml; pass --outbox for local delivery")?;
        SmtpTransport::new(smtp.to_smtp_config()?)
            .send(&envelope)
            .await?;
    }

    tracing::info!(
        "Sent message {} to {} recipient(s)",
        envelope.message_id,
        envelope.recipients.len()
    );

    Ok(())
}

/// Pick a MIME type from the filename extension, case-insensitively.
fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_mime_types_by_extension() {
        assert_eq!(mime_for_filename("logo.png"), "image/png");
        assert_eq!(mime_for_filename("report.pdf"), "application/pdf");
        assert_eq!(mime_for_filename("data"), "application/octet-stream");
    }

    #[test]
    fn extension_matching_ignores_case() {
        assert_eq!(mime_for_filename("logo.PNG"), "image/png");
        assert_eq!(mime_for_filename("photo.Jpeg"), "image/jpeg");
    }
}
