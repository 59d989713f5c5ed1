//! MIME encoding: from a [`Message`] to a transport-ready [`Envelope`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use uuid::Uuid;

use crate::message::{Message, MessageError};

/// A fully encoded message plus the addresses a transport needs.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// MAIL FROM address
    pub sender: String,

    /// RCPT TO addresses (to + cc + bcc, deduplicated)
    pub recipients: Vec<String>,

    /// The Message-ID local part, usable as a stable filename
    pub message_id: String,

    /// Complete header block and body, CRLF line endings
    pub data: String,
}

/// Encode `msg` as an RFC 5322 document with a multipart MIME body.
///
/// Header order is deterministic: the standard headers in a fixed order,
/// then derived and custom headers sorted by name. Date and Message-ID are
/// the only non-deterministic content.
pub(crate) fn encode(msg: &Message) -> Result<Envelope, MessageError> {
    let from = msg
        .from
        .as_deref()
        .ok_or(MessageError::MissingSender)?
        .to_string();

    let recipients = msg.all_recipients();
    if recipients.is_empty() {
        return Err(MessageError::NoRecipients);
    }

    if msg.html_body.is_none() && msg.plain_body.is_none() && msg.attachments.is_empty() {
        return Err(MessageError::EmptyMessage);
    }

    check_header("From", &from)?;
    for addr in &recipients {
        check_header("recipient", addr)?;
    }

    let message_id = Uuid::new_v4().simple().to_string();
    let mixed_boundary = generate_boundary();
    let alt_boundary = generate_boundary();

    let mut header = String::new();
    push_header(&mut header, "From", &from)?;
    push_header(&mut header, "To", &msg.to.join(", "))?;
    if !msg.cc.is_empty() {
        push_header(&mut header, "Cc", &msg.cc.join(", "))?;
    }
    if let Some(reply_to) = &msg.reply_to {
        push_header(&mut header, "Reply-To", reply_to)?;
    }
    if let Some(subject) = &msg.subject {
        push_header(&mut header, "Subject", subject)?;
    }
    push_header(&mut header, "Date", &chrono::Utc::now().to_rfc2822())?;
    push_header(&mut header, "Message-ID", &format!("<{message_id}@missive>"))?;
    push_header(&mut header, "MIME-Version", "1.0")?;
    push_header(
        &mut header,
        "Content-Type",
        &format!("multipart/mixed; boundary=\"{mixed_boundary}\""),
    )?;

    // Derived headers merge with custom ones so the whole tail sorts by name.
    let mut extra = msg.custom_headers.clone();
    if let Some(priority) = msg.priority {
        extra.insert("X-Priority".to_string(), priority.x_priority().to_string());
        extra.insert("Importance".to_string(), priority.importance().to_string());
    }
    if msg.dsn_read_receipt {
        extra.insert("Disposition-Notification-To".to_string(), from.clone());
    }
    if msg.dsn_delivery_receipt {
        extra.insert("Return-Receipt-To".to_string(), from.clone());
    }
    for (name, value) in &extra {
        check_header(name, name)?;
        push_header(&mut header, name, value)?;
    }

    let mut body = String::new();
    body.push_str("\r\n");
    body.push_str(&format!("--{mixed_boundary}\r\n"));
    body.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{alt_boundary}\"\r\n\r\n"
    ));

    // Plain part first so clients preferring text pick it up.
    if let Some(plain) = &msg.plain_body {
        body.push_str(&format!("--{alt_boundary}\r\n"));
        body.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
        body.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        body.push_str(&normalize_crlf(plain));
        body.push_str("\r\n");
    }
    if let Some(html) = &msg.html_body {
        body.push_str(&format!("--{alt_boundary}\r\n"));
        body.push_str("Content-Type: text/html; charset=\"UTF-8\"\r\n");
        body.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        body.push_str(&normalize_crlf(html));
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{alt_boundary}--\r\n"));

    for att in &msg.attachments {
        check_header("attachment filename", &att.filename)?;
        check_header("attachment MIME type", &att.mime_type)?;

        body.push_str(&format!("--{mixed_boundary}\r\n"));
        body.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            att.mime_type, att.filename
        ));
        body.push_str("Content-Transfer-Encoding: base64\r\n");
        body.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            att.filename
        ));
        if has_image_extension(&att.filename) {
            // Inline-referencable from the HTML body via cid:
            body.push_str(&format!("Content-ID: <{}>\r\n", att.filename));
        }
        body.push_str("\r\n");
        body.push_str(&encode_base64_lines(&att.data));
    }
    body.push_str(&format!("--{mixed_boundary}--\r\n"));

    tracing::debug!(
        recipients = recipients.len(),
        attachments = msg.attachments.len(),
        "Encoded message {message_id}"
    );

    Ok(Envelope {
        sender: from,
        recipients,
        message_id,
        data: header + &body,
    })
}

/// Build a `data:` URI for embedding binary content inline.
pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

fn push_header(out: &mut String, name: &str, value: &str) -> Result<(), MessageError> {
    check_header(name, value)?;
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
    Ok(())
}

/// Refuse CR/LF in header-position values (header injection).
fn check_header(field: &str, value: &str) -> Result<(), MessageError> {
    if value.contains('\r') || value.contains('\n') {
        return Err(MessageError::HeaderInjection(field.to_string()));
    }
    Ok(())
}

fn generate_boundary() -> String {
    format!("BOUNDARY-{}", Uuid::new_v4().simple())
}

/// Standard base64, wrapped at 76 columns with CRLF.
fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + (encoded.len() / 76 + 1) * 2);
    for chunk in encoded.as_bytes().chunks(76) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Convert bare LF and bare CR line endings to CRLF without doubling
/// existing CRLFs.
fn normalize_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                out.push_str("\r\n");
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => out.push_str("\r\n"),
            _ => out.push(c),
        }
    }
    out
}

fn has_image_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    [".png", ".jpg", ".jpeg", ".gif"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}
