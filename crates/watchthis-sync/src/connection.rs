//! ConnectionManager: owns the single push-channel socket of a session.
//!
//! The socket lives in a spawned I/O task.  The manager keeps only:
//! - a `watch` snapshot of the lifecycle state (read by `send` and by the
//!   recommendation coordinator when it picks a channel),
//! - the outbound sender feeding the I/O task,
//! - a cancellation token used to close.
//!
//! Lifecycle transitions and decoded inbound frames are delivered on one
//! `mpsc` receiver returned by [`ConnectionManager::open`].  There is exactly
//! one consumer; nothing is broadcast.
//!
//! Transitions:
//! ```text
//!   Connecting -> Open      handshake completed
//!   Connecting -> Closed    close() before the handshake finished
//!   Connecting -> Failed    transport error / handshake timeout
//!   Open       -> Closed    close() or remote close
//!   Open       -> Failed    transport error
//! ```
//! `Closed` and `Failed` are terminal; recovery means opening a new manager.

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use watchthis_proto::protocol::{InboundMessage, OutboundMessage};

use crate::error::SyncError;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closed)
                | (Connecting, Failed)
                | (Open, Closed)
                | (Open, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Open",
            ConnectionState::Closed => "Closed",
            ConnectionState::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// What the single subscriber sees.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    StateChanged(ConnectionState),
    Message(InboundMessage),
}

/// Outcome of [`PushSink::send`].  Sending never fails loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// Dropped (not queued) because the channel was not open.
    Dropped(ConnectionState),
}

impl SendStatus {
    pub fn is_sent(self) -> bool {
        self == SendStatus::Sent
    }
}

/// The part of a push channel the recommendation coordinator needs.
pub trait PushSink {
    fn state(&self) -> ConnectionState;
    fn send(&self, message: &OutboundMessage) -> SendStatus;
}

/// Stand-in sink for sessions running without a push channel.
pub struct Detached;

impl PushSink for Detached {
    fn state(&self) -> ConnectionState {
        ConnectionState::Closed
    }

    fn send(&self, message: &OutboundMessage) -> SendStatus {
        warn!("push channel disabled, dropping {:?}", message);
        SendStatus::Dropped(ConnectionState::Closed)
    }
}

pub struct ConnectionManager {
    url: String,
    state_rx: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    close_issued: bool,
}

impl ConnectionManager {
    /// Start connecting to `<endpoint>/<session_id>`.
    ///
    /// Returns immediately in `Connecting`; the handshake runs on a spawned
    /// task.  Must be called from within a tokio runtime.
    pub fn open(
        endpoint: &str,
        session_id: &str,
        connect_timeout: Duration,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), session_id);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        info!("push: connecting to {}", url);
        let lifecycle = Lifecycle {
            state_tx,
            events: event_tx,
        };
        tokio::spawn(run_socket(
            url.clone(),
            connect_timeout,
            cancel.clone(),
            lifecycle,
            outbound_rx,
        ));

        let manager = Self {
            url,
            state_rx,
            outbound: outbound_tx,
            cancel,
            close_issued: false,
        };
        (manager, event_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_close_issued(&self) -> bool {
        self.close_issued
    }

    /// Request shutdown.  Safe before the handshake completes and safe to
    /// call repeatedly; only the first call has any effect.
    pub fn close(&mut self) {
        if self.close_issued {
            debug!("push: close already issued for {}", self.url);
            return;
        }
        self.close_issued = true;
        info!("push: closing {} (state {})", self.url, self.state());
        self.cancel.cancel();
    }
}

impl PushSink for ConnectionManager {
    fn state(&self) -> ConnectionState {
        ConnectionManager::state(self)
    }

    fn send(&self, message: &OutboundMessage) -> SendStatus {
        let state = self.state();
        if state != ConnectionState::Open || self.close_issued {
            warn!("push: not open ({}), dropping {:?}", state, message);
            return SendStatus::Dropped(state);
        }
        let text = match message.encode() {
            Ok(t) => t,
            Err(e) => {
                warn!("push: could not encode {:?}: {}", message, e);
                return SendStatus::Dropped(state);
            }
        };
        if self.outbound.send(text).is_err() {
            warn!("push: socket task gone, dropping {:?}", message);
            return SendStatus::Dropped(self.state());
        }
        debug!("push: sent {:?}", message);
        SendStatus::Sent
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writer side of the lifecycle: the only place transitions happen.
struct Lifecycle {
    state_tx: watch::Sender<ConnectionState>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl Lifecycle {
    async fn advance(&self, next: ConnectionState) {
        let current = *self.state_tx.borrow();
        if !current.can_transition_to(next) {
            debug!("push: ignoring transition {} -> {}", current, next);
            return;
        }
        info!("push: {} -> {}", current, next);
        self.state_tx.send_replace(next);
        let _ = self.events.send(ConnectionEvent::StateChanged(next)).await;
    }

    async fn fail(&self, err: SyncError) {
        warn!("push: {}", err);
        self.advance(ConnectionState::Failed).await;
    }

    async fn deliver(&self, text: &str) {
        match InboundMessage::decode(text) {
            Ok(msg) => {
                debug!("push: received {} ({} movies)", msg.kind.as_wire(), msg.payload.len());
                let _ = self.events.send(ConnectionEvent::Message(msg)).await;
            }
            Err(e) => {
                let err = SyncError::Malformed(e.to_string());
                warn!("push: dropping frame: {}", err);
            }
        }
    }
}

async fn run_socket(
    url: String,
    connect_timeout: Duration,
    cancel: CancellationToken,
    lifecycle: Lifecycle,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let handshake = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(&url));
    let ws = tokio::select! {
        _ = cancel.cancelled() => {
            lifecycle.advance(ConnectionState::Closed).await;
            return;
        }
        res = handshake => match res {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                lifecycle.fail(SyncError::Transport(format!("connect {}: {}", url, e))).await;
                return;
            }
            Err(_) => {
                lifecycle
                    .fail(SyncError::Transport(format!(
                        "connect {}: no handshake after {:?}",
                        url, connect_timeout
                    )))
                    .await;
                return;
            }
        },
    };

    lifecycle.advance(ConnectionState::Open).await;
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!("push: close frame not delivered: {}", e);
                }
                lifecycle.advance(ConnectionState::Closed).await;
                break;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    lifecycle.fail(SyncError::Transport(format!("send: {}", e))).await;
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => lifecycle.deliver(&text).await,
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => lifecycle.deliver(text).await,
                    Err(e) => warn!("push: dropping non-UTF-8 frame: {}", e),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("push: remote closed ({:?})", frame);
                    lifecycle.advance(ConnectionState::Closed).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    lifecycle.fail(SyncError::Transport(format!("receive: {}", e))).await;
                    break;
                }
                None => {
                    info!("push: stream ended");
                    lifecycle.advance(ConnectionState::Closed).await;
                    break;
                }
            },
        }
    }
}
