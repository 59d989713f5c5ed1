//! The transport seam and the filesystem outbox.

use std::path::PathBuf;

use async_trait::async_trait;
use missive_message::Envelope;

use crate::smtp::SmtpError;

/// Errors that can occur while delivering an envelope.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Smtp(#[from] SmtpError),

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Something that can deliver an encoded envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

/// A transport that writes each envelope as `<outbox>/<message-id>.eml`.
///
/// Useful for local development and as a dead-letter destination; nothing
/// leaves the machine.
pub struct FileTransport {
    outbox: PathBuf,
}

impl FileTransport {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
        }
    }

    pub fn outbox(&self) -> &PathBuf {
        &self.outbox
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.outbox)
            .await
            .map_err(|e| TransportError::Write {
                path: self.outbox.display().to_string(),
                message: e.to_string(),
            })?;

        let path = self.outbox.join(format!("{}.eml", envelope.message_id));
        tokio::fs::write(&path, envelope.data.as_bytes())
            .await
            .map_err(|e| TransportError::Write {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}
