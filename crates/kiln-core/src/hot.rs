//! Hot-update event channel.
//!
//! [`UpdateNotifier`] is the capability the server and watcher share: the
//! watcher pushes events in, each connected WebSocket client drains its
//! own subscription. Events serialize to the tagged JSON the client
//! runtime consumes.

use serde::Serialize;
use tokio::sync::broadcast;

/// WebSocket path clients connect to for update notifications.
pub const HOT_SOCKET_PATH: &str = "/__hot";

/// Path the client runtime is served at.
pub const HOT_CLIENT_PATH: &str = "/@hot-client";

/// A single module update pushed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleUpdate {
    /// Public URL of the changed asset.
    pub module: String,
    /// Update timestamp, milliseconds since the epoch.
    pub timestamp: u64,
}

/// Events relayed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdateEvent {
    /// Sent once when a client connects.
    Connected,
    /// The artifact changed in a way that needs a full page reload.
    Reload,
    /// Individual assets changed.
    Update { updates: Vec<ModuleUpdate> },
    /// A rebuild failed; clients render the message.
    #[serde(rename = "error")]
    BuildError { message: String },
}

impl UpdateEvent {
    /// Wire form of the event.
    #[must_use]
    pub fn to_json(&self) -> String {
        // UpdateEvent has no unserializable fields; the fallback keeps the
        // client moving if that ever changes.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

/// Capability: pushes change events to connected clients.
pub trait UpdateNotifier: Send + Sync {
    /// Push an event to every connected client. Never blocks; with no
    /// clients connected the event is dropped.
    fn notify(&self, event: UpdateEvent);

    /// Open a per-client event stream.
    fn subscribe(&self) -> broadcast::Receiver<UpdateEvent>;
}

/// Broadcast-backed notifier.
pub struct HotChannel {
    tx: broadcast::Sender<UpdateEvent>,
}

impl HotChannel {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for HotChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl UpdateNotifier for HotChannel {
    fn notify(&self, event: UpdateEvent) {
        // Send fails only when no receiver exists; nobody connected is fine.
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }
}

/// Generate the client runtime served at [`HOT_CLIENT_PATH`].
#[must_use]
pub fn client_runtime(port: u16) -> String {
    HOT_CLIENT_RUNTIME.replace("__HOT_PORT__", &port.to_string())
}

/// The hot client runtime.
///
/// Minimal by design: connect, log readiness, reload on change. Build
/// errors render an overlay instead of leaving a stale page up.
const HOT_CLIENT_RUNTIME: &str = r"
// kiln hot client
const hotPort = __HOT_PORT__;

let ws;
let isConnected = false;

function setupWebSocket() {
  ws = new WebSocket(`ws://${location.hostname}:${hotPort}/__hot`);

  ws.onopen = () => {
    isConnected = true;
  };

  ws.onmessage = (event) => {
    handleMessage(JSON.parse(event.data));
  };

  ws.onclose = () => {
    if (isConnected) {
      console.log('[kiln] server connection lost. Polling for restart...');
      isConnected = false;
      setTimeout(() => location.reload(), 1000);
    }
  };
}

function handleMessage(msg) {
  switch (msg.type) {
    case 'connected':
      console.log('[kiln] ready.');
      break;

    case 'update':
    case 'reload':
      hideErrorOverlay();
      location.reload();
      break;

    case 'error':
      console.error('[kiln] build error:', msg.message);
      showErrorOverlay(msg.message);
      break;
  }
}

function showErrorOverlay(message) {
  let overlay = document.getElementById('__kiln_error_overlay');
  if (!overlay) {
    overlay = document.createElement('div');
    overlay.id = '__kiln_error_overlay';
    overlay.style.cssText = `
      position: fixed; top: 0; left: 0; right: 0; bottom: 0;
      background: rgba(0,0,0,0.9); color: #ff5555;
      padding: 32px; font-family: monospace; font-size: 16px;
      white-space: pre-wrap; overflow: auto; z-index: 999999;
    `;
    document.body.appendChild(overlay);
  }
  overlay.textContent = 'Build Error:\n\n' + message;
  overlay.style.display = 'block';
}

function hideErrorOverlay() {
  const overlay = document.getElementById('__kiln_error_overlay');
  if (overlay) overlay.style.display = 'none';
}

setupWebSocket();
";
