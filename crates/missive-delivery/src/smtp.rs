//! Cleartext SMTP client for local relays and test servers.
//!
//! Speaks just enough ESMTP for dev use (MailHog/Mailpit-style): EHLO,
//! optional AUTH PLAIN or AUTH LOGIN, MAIL/RCPT/DATA with dot-stuffing,
//! RSET, QUIT. TLS is deliberately not offered here; production delivery
//! belongs to a real relay behind this client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use missive_message::Envelope;

use crate::transport::{Transport, TransportError};

/// SASL mechanism used for AUTH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    Plain,
    Login,
}

/// Username and password for AUTH.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub mechanism: AuthMechanism,
}

/// Connection settings for an SMTP server.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Errors that can occur while talking to an SMTP server.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    #[error("Failed to connect to {addr}: {message}")]
    Connect { addr: String, message: String },

    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed server reply: {0}")]
    MalformedReply(String),

    #[error("Unexpected reply to {command}: {code} {text}")]
    UnexpectedReply {
        command: String,
        code: u16,
        text: String,
    },
}

/// A parsed server reply: final code plus every text line.
#[derive(Debug)]
struct Reply {
    code: u16,
    text: Vec<String>,
}

/// One open SMTP session. Created connected and greeted (EHLO done).
pub(crate) struct SmtpSession {
    stream: BufStream<TcpStream>,
}

impl SmtpSession {
    pub(crate) async fn connect(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| SmtpError::Connect {
                addr: addr.clone(),
                message: e.to_string(),
            })?;

        let mut session = Self {
            stream: BufStream::new(stream),
        };
        session.expect_reply("greeting", &[220]).await?;
        session.command("EHLO", "EHLO localhost", &[250]).await?;

        tracing::debug!("Connected to {addr}");
        Ok(session)
    }

    pub(crate) async fn authenticate(&mut self, creds: &Credentials) -> Result<(), SmtpError> {
        match creds.mechanism {
            AuthMechanism::Plain => {
                let payload =
                    STANDARD.encode(format!("\0{}\0{}", creds.username, creds.password));
                self.command("AUTH PLAIN", &format!("AUTH PLAIN {payload}"), &[235])
                    .await?;
            }
            AuthMechanism::Login => {
                self.command("AUTH LOGIN", "AUTH LOGIN", &[334]).await?;
                self.command("AUTH LOGIN", &STANDARD.encode(&creds.username), &[334])
                    .await?;
                self.command("AUTH LOGIN", &STANDARD.encode(&creds.password), &[235])
                    .await?;
            }
        }
        Ok(())
    }

    /// Run one mail transaction: MAIL FROM, RCPT TO per recipient, DATA.
    pub(crate) async fn send_envelope(&mut self, envelope: &Envelope) -> Result<(), SmtpError> {
        self.command(
            "MAIL FROM",
            &format!("MAIL FROM:<{}>", envelope.sender),
            &[250],
        )
        .await?;

        for rcpt in &envelope.recipients {
            self.command("RCPT TO", &format!("RCPT TO:<{rcpt}>"), &[250, 251])
                .await?;
        }

        self.command("DATA", "DATA", &[354]).await?;
        self.stream
            .write_all(dot_stuff(&envelope.data).as_bytes())
            .await?;
        self.stream.write_all(b".\r\n").await?;
        self.stream.flush().await?;
        self.expect_reply("DATA terminator", &[250]).await?;

        Ok(())
    }

    /// Reset session state between pooled transactions.
    pub(crate) async fn rset(&mut self) -> Result<(), SmtpError> {
        self.command("RSET", "RSET", &[250]).await?;
        Ok(())
    }

    /// Close the session politely. Errors are ignored; the connection is
    /// going away either way.
    pub(crate) async fn quit(mut self) {
        let _ = self.command("QUIT", "QUIT", &[221]).await;
    }

    async fn command(
        &mut self,
        label: &str,
        line: &str,
        expected: &[u16],
    ) -> Result<Reply, SmtpError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        self.expect_reply(label, expected).await
    }

    async fn expect_reply(&mut self, label: &str, expected: &[u16]) -> Result<Reply, SmtpError> {
        let reply = self.read_reply().await?;
        if !expected.contains(&reply.code) {
            return Err(SmtpError::UnexpectedReply {
                command: label.to_string(),
                code: reply.code,
                text: reply.text.join(" / "),
            });
        }
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply, SmtpError> {
        let mut code = 0;
        let mut text = Vec::new();

        loop {
            let mut line = String::new();
            let n = self.stream.read_line(&mut line).await?;
            if n == 0 {
                return Err(SmtpError::MalformedReply(
                    "connection closed mid-reply".to_string(),
                ));
            }

            let (line_code, more, message) =
                parse_reply_line(line.trim_end_matches(['\r', '\n']))?;
            code = line_code;
            text.push(message.to_string());

            if !more {
                break;
            }
        }

        Ok(Reply { code, text })
    }
}

/// Split one reply line into (code, continuation?, text).
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), SmtpError> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(SmtpError::MalformedReply(line.to_string()));
    }

    let code: u16 = line[..3]
        .parse()
        .map_err(|_| SmtpError::MalformedReply(line.to_string()))?;

    match bytes.get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(SmtpError::MalformedReply(line.to_string())),
    }
}

/// Normalize line endings to CRLF and double any leading dot, so the body
/// cannot terminate the DATA phase early.
fn dot_stuff(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 16);
    for line in data.lines() {
        if line.as_bytes().first() == Some(&b'.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

/// One SMTP connection per send: dial, optional AUTH, transaction, QUIT.
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let mut session = SmtpSession::connect(&self.config).await?;
        if let Some(creds) = &self.config.credentials {
            session.authenticate(creds).await?;
        }
        session.send_envelope(envelope).await?;
        session.quit().await;

        tracing::info!(
            recipients = envelope.recipients.len(),
            "Delivered message {}",
            envelope.message_id
        );
        Ok(())
    }
}

/// Health probe: dial, EHLO, optional AUTH, QUIT. No mail is sent.
pub async fn check_connection(config: &SmtpConfig) -> Result<(), SmtpError> {
    let mut session = SmtpSession::connect(config).await?;
    if let Some(creds) = &config.credentials {
        session.authenticate(creds).await?;
    }
    session.quit().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// A minimal in-process SMTP server for one connection. Records every
    /// client line (including DATA content as transmitted) and returns them
    /// when the client disconnects.
    async fn mock_smtp() -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = BufStream::new(stream);
            let mut lines = Vec::new();

            stream.write_all(b"220 mock ESMTP\r\n").await.unwrap();
            stream.flush().await.unwrap();

            let mut in_auth_login = 0u8;
            loop {
                let mut line = String::new();
                if stream.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                lines.push(line.clone());

                let reply: &[u8] = if in_auth_login == 1 {
                    in_auth_login = 2;
                    b"334 UGFzc3dvcmQ6\r\n"
                } else if in_auth_login == 2 {
                    in_auth_login = 0;
                    b"235 authenticated\r\n"
                } else if line.starts_with("EHLO") {
                    b"250-mock greets you\r\n250 AUTH PLAIN LOGIN\r\n"
                } else if line.starts_with("AUTH PLAIN") {
                    b"235 authenticated\r\n"
                } else if line == "AUTH LOGIN" {
                    in_auth_login = 1;
                    b"334 VXNlcm5hbWU6\r\n"
                } else if line.starts_with("MAIL FROM") || line.starts_with("RCPT TO") {
                    b"250 ok\r\n"
                } else if line == "DATA" {
                    stream.write_all(b"354 go ahead\r\n").await.unwrap();
                    stream.flush().await.unwrap();
                    loop {
                        let mut data_line = String::new();
                        if stream.read_line(&mut data_line).await.unwrap() == 0 {
                            break;
                        }
                        let data_line = data_line.trim_end_matches(['\r', '\n']).to_string();
                        if data_line == "." {
                            break;
                        }
                        lines.push(format!("DATA> {data_line}"));
                    }
                    b"250 queued\r\n"
                } else if line == "RSET" {
                    b"250 flushed\r\n"
                } else if line == "QUIT" {
                    stream.write_all(b"221 bye\r\n").await.unwrap();
                    stream.flush().await.unwrap();
                    break;
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

    fn envelope(data: &str) -> Envelope {
        Envelope {
            sender: "sender@example.com".to_string(),
            recipients: vec![
                "one@example.com".to_string(),
                "two@example.com".to_string(),
            ],
            message_id: "m1".to_string(),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn sends_full_transaction() {
        let (addr, server) = mock_smtp().await;
        let transport = SmtpTransport::new(SmtpConfig::new(addr.ip().to_string(), addr.port()));

        transport
            .send(&envelope("Subject: hi\r\n\r\nbody\r\n"))
            .await
            .unwrap();

        let lines = server.await.unwrap();
        assert!(lines.contains(&"MAIL FROM:<sender@example.com>".to_string()));
        assert!(lines.contains(&"RCPT TO:<one@example.com>".to_string()));
        assert!(lines.contains(&"RCPT TO:<two@example.com>".to_string()));
        assert!(lines.contains(&"DATA> body".to_string()));
        assert!(lines.contains(&"QUIT".to_string()));
    }

    #[tokio::test]
    async fn dot_stuffs_data_on_the_wire() {
        let (addr, server) = mock_smtp().await;
        let transport = SmtpTransport::new(SmtpConfig::new(addr.ip().to_string(), addr.port()));

        transport
            .send(&envelope("Subject: hi\r\n\r\n.hidden\r\nok\r\n"))
            .await
            .unwrap();

        let lines = server.await.unwrap();
        assert!(lines.contains(&"DATA> ..hidden".to_string()));
        assert!(lines.contains(&"DATA> ok".to_string()));
    }

    #[tokio::test]
    async fn auth_plain_sends_initial_response() {
        let (addr, server) = mock_smtp().await;
        let config = SmtpConfig::new(addr.ip().to_string(), addr.port()).with_credentials(
            Credentials {
                username: "alice".to_string(),
                password: "secret".to_string(),
                mechanism: AuthMechanism::Plain,
            },
        );

        SmtpTransport::new(config)
            .send(&envelope("x\r\n"))
            .await
            .unwrap();

        let expected = format!("AUTH PLAIN {}", STANDARD.encode("\0alice\0secret"));
        let lines = server.await.unwrap();
        assert!(lines.contains(&expected));
    }

    #[tokio::test]
    async fn auth_login_sends_base64_username_and_password() {
        let (addr, server) = mock_smtp().await;
        let config = SmtpConfig::new(addr.ip().to_string(), addr.port()).with_credentials(
            Credentials {
                username: "alice".to_string(),
                password: "secret".to_string(),
                mechanism: AuthMechanism::Login,
            },
        );

        SmtpTransport::new(config)
            .send(&envelope("x\r\n"))
            .await
            .unwrap();

        let lines = server.await.unwrap();
        assert!(lines.contains(&"AUTH LOGIN".to_string()));
        assert!(lines.contains(&STANDARD.encode("alice")));
        assert!(lines.contains(&STANDARD.encode("secret")));
    }

    #[tokio::test]
    async fn check_connection_probes_without_sending() {
        let (addr, server) = mock_smtp().await;
        let config = SmtpConfig::new(addr.ip().to_string(), addr.port());

        check_connection(&config).await.unwrap();

        let lines = server.await.unwrap();
        assert!(lines.iter().any(|l| l.starts_with("EHLO")));
        assert!(!lines.iter().any(|l| l.starts_with("MAIL FROM")));
    }

    #[tokio::test]
    async fn connect_failure_surfaces_address() {
        // Port 1 is essentially never listening.
        let config = SmtpConfig::new("127.0.0.1", 1);
        let err = check_connection(&config).await.unwrap_err();

        assert!(matches!(err, SmtpError::Connect { addr, .. } if addr == "127.0.0.1:1"));
    }

    #[test]
    fn parses_single_line_reply() {
        let (code, more, text) = parse_reply_line("250 ok").unwrap();
        assert_eq!((code, more, text), (250, false, "ok"));
    }

    #[test]
    fn parses_continuation_line() {
        let (code, more, text) = parse_reply_line("250-mock greets you").unwrap();
        assert_eq!((code, more, text), (250, true, "mock greets you"));
    }

    #[test]
    fn parses_bare_code_reply() {
        let (code, more, text) = parse_reply_line("354").unwrap();
        assert_eq!((code, more, text), (354, false, ""));
    }

    #[test]
    fn rejects_malformed_reply_lines() {
        assert!(parse_reply_line("ok").is_err());
        assert!(parse_reply_line("25x ok").is_err());
        assert!(parse_reply_line("250xok").is_err());
    }

    #[test]
    fn dot_stuffing_doubles_leading_dots() {
        assert_eq!(dot_stuff(".a\r\nb\r\n..c\r\n"), "..a\r\nb\r\n...c\r\n");
    }

    #[test]
    fn dot_stuffing_normalizes_bare_lf() {
        assert_eq!(dot_stuff("a\nb"), "a\r\nb\r\n");
    }
}
