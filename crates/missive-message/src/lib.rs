//! Email message model and MIME document assembly.
//!
//! A [`Message`] collects recipients, subject, bodies, and attachments
//! through builder-style setters; [`Message::build`] encodes it into an
//! [`Envelope`] - an RFC 5322 header block plus multipart MIME body with
//! CRLF line endings, ready for an SMTP transport.

pub mod message;
pub mod mime;

pub use message::{Attachment, Message, MessageError, Priority};
pub use mime::{data_uri, Envelope};
