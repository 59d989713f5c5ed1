//! Async send queue with worker tasks, rate limiting, and retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use missive_message::Envelope;

use crate::transport::{Transport, TransportError};

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of worker tasks
    pub workers: usize,

    /// Bounded channel capacity; `enqueue` waits when full
    pub capacity: usize,

    /// Sends per second, per worker
    pub rate_limit: u32,

    /// Additional attempts after a failed send
    pub retry_count: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            capacity: 64,
            rate_limit: 10,
            retry_count: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Final outcome for one enqueued envelope.
#[derive(Debug)]
pub struct SendReport {
    pub message_id: String,
    pub recipients: Vec<String>,

    /// Attempts actually made (at least 1)
    pub attempts: u32,

    pub result: Result<(), TransportError>,
}

/// A pool of worker tasks draining a bounded envelope channel.
///
/// Every enqueued envelope eventually produces exactly one [`SendReport`]
/// on the results channel. [`DeliveryQueue::shutdown`] stops intake, drains
/// what is already queued, and waits for the workers.
pub struct DeliveryQueue {
    tx: mpsc::Sender<Envelope>,
    workers: Vec<JoinHandle<()>>,
}

impl DeliveryQueue {
    /// Start the workers. Returns the queue handle and the results channel.
    pub fn start(
        transport: Arc<dyn Transport>,
        config: QueueConfig,
    ) -> (Self, mpsc::Receiver<SendReport>) {
        let (tx, rx) = mpsc::channel::<Envelope>(config.capacity.max(1));
        let (report_tx, report_rx) = mpsc::channel::<SendReport>(config.capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let report_tx = report_tx.clone();
                let transport = Arc::clone(&transport);
                let config = config.clone();

                tokio::spawn(async move {
                    worker_loop(worker_id, rx, report_tx, transport, config).await;
                })
            })
            .collect();

        (Self { tx, workers }, report_rx)
    }

    /// Queue an envelope for delivery, waiting if the channel is full.
    ///
    /// Returns the envelope back if the queue has been shut down.
    pub async fn enqueue(&self, envelope: Envelope) -> Result<(), Envelope> {
        self.tx.send(envelope).await.map_err(|e| e.0)
    }

    /// Stop accepting work, drain the channel, and wait for the workers.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    report_tx: mpsc::Sender<SendReport>,
    transport: Arc<dyn Transport>,
    config: QueueConfig,
) {
    let tick = Duration::from_secs(1) / config.rate_limit.max(1);
    let mut interval = tokio::time::interval(tick);

    loop {
        let envelope = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(envelope) = envelope else { break };

        interval.tick().await;

        let mut attempts = 0;
        let mut outcome = Ok(());
        while attempts <= config.retry_count {
            attempts += 1;
            match transport.send(&envelope).await {
                Ok(()) => {
                    outcome = Ok(());
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        worker_id,
                        attempts,
                        "Send failed for message {}: {e}",
                        envelope.message_id
                    );
                    outcome = Err(e);
                    if attempts <= config.retry_count {
                        tokio::time::sleep(config.retry_delay).await;
                    }
                }
            }
        }

        let report = SendReport {
            message_id: envelope.message_id.clone(),
            recipients: envelope.recipients.clone(),
            attempts,
            result: outcome,
        };

        // Receiver may be gone; delivery already happened either way.
        let _ = report_tx.send(report).await;
    }

    tracing::debug!(worker_id, "Queue worker exiting");
}
