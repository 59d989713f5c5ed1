//! Sequential batch sending.

use missive_message::Envelope;

use crate::transport::{Transport, TransportError};

/// Outcome for one envelope in a batch, keyed by its first recipient.
#[derive(Debug)]
pub struct BatchOutcome {
    pub recipient: String,
    pub result: Result<(), TransportError>,
}

/// Send envelopes one at a time, collecting per-message outcomes.
///
/// A failure does not stop the batch; each envelope gets its own result.
pub async fn send_batch(transport: &dyn Transport, envelopes: &[Envelope]) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(envelopes.len());

    for envelope in envelopes {
        let recipient = envelope.recipients.first().cloned().unwrap_or_default();
        let result = transport.send(envelope).await;
        outcomes.push(BatchOutcome { recipient, result });
    }

    outcomes
}
