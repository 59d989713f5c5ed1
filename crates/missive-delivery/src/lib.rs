//! Email delivery.
//!
//! The [`Transport`] trait is the seam: an async `send(&Envelope)`.
//! Implementations cover cleartext SMTP for dev relays ([`SmtpTransport`]),
//! a pooled variant ([`SmtpPool`]), and a filesystem outbox
//! ([`FileTransport`]). On top sit an async worker queue with rate limiting
//! and retries ([`DeliveryQueue`]) and a sequential batch helper.

pub mod batch;
pub mod pool;
pub mod queue;
pub mod smtp;
pub mod transport;

pub use batch::{send_batch, BatchOutcome};
pub use pool::SmtpPool;
pub use queue::{DeliveryQueue, QueueConfig, SendReport};
pub use smtp::{check_connection, AuthMechanism, Credentials, SmtpConfig, SmtpError, SmtpTransport};
pub use transport::{FileTransport, Transport, TransportError};
