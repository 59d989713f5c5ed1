//! The message model.

use std::collections::BTreeMap;

use crate::mime::{self, Envelope};

/// Message priority, mapped to `X-Priority` and `Importance` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Highest,
    High,
    Normal,
    Low,
    Lowest,
}

impl Priority {
    /// `X-Priority` header value.
    pub(crate) fn x_priority(self) -> &'static str {
        match self {
            Priority::Highest => "1 (Highest)",
            Priority::High => "2 (High)",
            Priority::Normal => "3 (Normal)",
            Priority::Low => "4 (Low)",
            Priority::Lowest => "5 (Lowest)",
        }
    }

    /// `Importance` header value.
    pub(crate) fn importance(self) -> &'static str {
        match self {
            Priority::Highest | Priority::High => "High",
            Priority::Normal => "Normal",
            Priority::Low | Priority::Lowest => "Low",
        }
    }
}

/// A file attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
    /// e.g. `application/pdf`, `image/png`
    pub mime_type: String,
}

/// An email message under construction.
///
/// Fields are public for inspection; the setters exist for builder-style
/// composition. [`Message::build`] validates and encodes the message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub html_body: Option<String>,
    pub plain_body: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Custom headers, kept sorted by name for deterministic output
    pub custom_headers: BTreeMap<String, String>,
    pub priority: Option<Priority>,
    /// Emit `Disposition-Notification-To` (read receipt)
    pub dsn_read_receipt: bool,
    /// Emit `Return-Receipt-To` (delivery receipt)
    pub dsn_delivery_receipt: bool,
}

/// Errors that can occur while building a message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message has no recipients")]
    NoRecipients,

    #[error("Message has no sender address")]
    MissingSender,

    #[error("Message has no body and no attachments")]
    EmptyMessage,

    #[error("Header value for '{0}' contains CR or LF")]
    HeaderInjection(String),
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_from(&mut self, addr: impl Into<String>) -> &mut Self {
        self.from = Some(addr.into());
        self
    }

    pub fn add_to(&mut self, addr: impl Into<String>) -> &mut Self {
        self.to.push(addr.into());
        self
    }

    pub fn add_cc(&mut self, addr: impl Into<String>) -> &mut Self {
        self.cc.push(addr.into());
        self
    }

    pub fn add_bcc(&mut self, addr: impl Into<String>) -> &mut Self {
        self.bcc.push(addr.into());
        self
    }

    pub fn set_reply_to(&mut self, addr: impl Into<String>) -> &mut Self {
        self.reply_to = Some(addr.into());
        self
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn set_html_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.html_body = Some(body.into());
        self
    }

    pub fn set_plain_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.plain_body = Some(body.into());
        self
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    pub fn set_priority(&mut self, priority: Priority) -> &mut Self {
        self.priority = Some(priority);
        self
    }

    pub fn set_dsn_read_receipt(&mut self, enable: bool) -> &mut Self {
        self.dsn_read_receipt = enable;
        self
    }

    pub fn set_dsn_delivery_receipt(&mut self, enable: bool) -> &mut Self {
        self.dsn_delivery_receipt = enable;
        self
    }

    /// Every recipient (to + cc + bcc), deduplicated, in insertion order.
    pub fn all_recipients(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .filter(|addr| seen.insert(addr.as_str()))
            .cloned()
            .collect()
    }

    /// Validate and encode this message into a transport-ready envelope.
    pub fn build(&self) -> Result<Envelope, MessageError> {
        mime::encode(self)
    }
}
