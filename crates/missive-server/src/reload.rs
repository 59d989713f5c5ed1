//! WebSocket-based browser reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to connected preview clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload after a template change
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the client-side reload script.
///
/// The WebSocket URL is derived from `location.host`, so the script works
/// regardless of the bound port.
pub fn reload_client_script() -> String {
    r#"
(function() {
  'use strict';

  const ws = new WebSocket('ws://' + location.host + '/__reload');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {
    console.log('[reload] Connected');
    reconnectAttempts = 0;
  };

  ws.onmessage = function(event) {
    const msg = JSON.parse(event.data);
    if (msg.type === 'reload') {
      location.reload();
    }
  };

  ws.onclose = function() {
    if (reconnectAttempts < maxReconnectAttempts) {
      reconnectAttempts++;
      setTimeout(function() {
        location.reload();
      }, 1000 * reconnectAttempts);
    }
  };
})();
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        assert_eq!(hub.subscriber_count(), 0);

        let mut rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            other => panic!("expected Reload message, got {other:?}"),
        }

        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let json = serde_json::to_string(&ReloadMessage::Reload).unwrap();
        assert!(json.contains("reload"));

        let json = serde_json::to_string(&ReloadMessage::Connected).unwrap();
        assert!(json.contains("connected"));
    }

    #[test]
    fn client_script_targets_the_reload_endpoint() {
        let script = reload_client_script();
        assert!(script.contains("/__reload"));
        assert!(script.contains("location.reload()"));
    }
}
