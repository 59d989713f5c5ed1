//! Pooled SMTP sessions.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use missive_message::Envelope;

use crate::smtp::{SmtpConfig, SmtpError, SmtpSession};
use crate::transport::{Transport, TransportError};

struct IdleSession {
    session: SmtpSession,
    last_used: Instant,
}

/// A bounded set of kept-alive SMTP sessions.
///
/// `send` reuses an idle session (RSET first) or dials a new one, up to the
/// connection cap; when the cap is reached callers wait. Sessions idle past
/// the max age are discarded instead of reused. A session that fails
/// mid-transaction is dropped, never returned to the pool.
pub struct SmtpPool {
    config: SmtpConfig,
    idle: Mutex<Vec<IdleSession>>,
    permits: Semaphore,
    max_idle_age: Duration,
}

impl SmtpPool {
    pub fn new(config: SmtpConfig, max_connections: usize) -> Self {
        Self {
            config,
            idle: Mutex::new(Vec::new()),
            permits: Semaphore::new(max_connections.max(1)),
            max_idle_age: Duration::from_secs(60),
        }
    }

    pub fn with_max_idle_age(mut self, age: Duration) -> Self {
        self.max_idle_age = age;
        self
    }

    /// Deliver one envelope through a pooled session.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), SmtpError> {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("pool semaphore closed");

        let mut session = self.checkout().await?;
        let result = session.send_envelope(envelope).await;

        match result {
            Ok(()) => {
                self.idle.lock().await.push(IdleSession {
                    session,
                    last_used: Instant::now(),
                });
                drop(permit);
                Ok(())
            }
            Err(e) => {
                // Session state is unknown after a failure; discard it.
                drop(session);
                drop(permit);
                Err(e)
            }
        }
    }

    /// Take an idle session, resetting it, or dial a fresh one.
    async fn checkout(&self) -> Result<SmtpSession, SmtpError> {
        loop {
            let candidate = {
                let mut idle = self.idle.lock().await;
                idle.pop()
            };

            let Some(candidate) = candidate else { break };

            if candidate.last_used.elapsed() > self.max_idle_age {
                tracing::debug!("Discarding SMTP session idle past max age");
                continue;
            }

            let mut session = candidate.session;
            match session.rset().await {
                Ok(()) => return Ok(session),
                Err(e) => {
                    tracing::debug!("Pooled session failed RSET, redialing: {e}");
                    continue;
                }
            }
        }

        let mut session = SmtpSession::connect(&self.config).await?;
        if let Some(creds) = &self.config.credentials {
            session.authenticate(creds).await?;
        }
        Ok(session)
    }
}

#[async_trait]
impl Transport for SmtpPool {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        SmtpPool::send(self, envelope).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Single-connection SMTP server that answers transactions until the
    /// client disconnects, then returns every command line it saw.
    async fn mock_smtp() -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = BufStream::new(stream);
            let mut lines = Vec::new();

            stream.write_all(b"220 mock ESMTP\r\n").await.unwrap();
            stream.flush().await.unwrap();

            loop {
                let mut line = String::new();
                if stream.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                lines.push(line.clone());

                let reply: &[u8] = if line.starts_with("EHLO") {
                    b"250 mock\r\n"
                } else if line.starts_with("MAIL FROM")
                    || line.starts_with("RCPT TO")
                    || line == "RSET"
                {
                    b"250 ok\r\n"
                } else if line == "DATA" {
                    stream.write_all(b"354 go ahead\r\n").await.unwrap();
                    stream.flush().await.unwrap();
                    loop {
                        let mut data_line = String::new();
                        if stream.read_line(&mut data_line).await.unwrap() == 0 {
                            break;
                        }
                        if data_line.trim_end_matches(['\r', '\n']) == "." {
                            break;
                        }
                    }
                    b"250 queued\r\n"
                } else {
                    b"500 unrecognized\r\n"
                };

                stream.write_all(reply).await.unwrap();
                stream.flush().await.unwrap();
            }

            lines
        });

        (addr, handle)
    }

    fn envelope() -> Envelope {
        Envelope {
            sender: "a@example.com".to_string(),
            recipients: vec!["b@example.com".to_string()],
            message_id: "m".to_string(),
            data: "body\r\n".to_string(),
        }
    }

    #[tokio::test]
    async fn reuses_one_session_across_sends() {
        let (addr, server) = mock_smtp().await;
        let pool = SmtpPool::new(SmtpConfig::new(addr.ip().to_string(), addr.port()), 2);

        pool.send(&envelope()).await.unwrap();
        pool.send(&envelope()).await.unwrap();
        drop(pool);

        let lines = server.await.unwrap();
        let ehlos = lines.iter().filter(|l| l.starts_with("EHLO")).count();
        let mails = lines.iter().filter(|l| l.starts_with("MAIL FROM")).count();
        let rsets = lines.iter().filter(|l| l.as_str() == "RSET").count();

        assert_eq!(ehlos, 1, "second send should reuse the session");
        assert_eq!(mails, 2);
        assert_eq!(rsets, 1, "reused session is reset first");
    }

    #[tokio::test]
    async fn sessions_idle_past_max_age_are_not_reused() {
        let (addr, _server) = mock_smtp().await;
        let pool = SmtpPool::new(SmtpConfig::new(addr.ip().to_string(), addr.port()), 2)
            .with_max_idle_age(Duration::ZERO);

        pool.send(&envelope()).await.unwrap();

        // The only pooled session is now too old; the next checkout dials
        // again, but the mock only accepts one connection.
        let err = pool.send(&envelope()).await;
        assert!(err.is_err());
    }
}
