// Signal listener - the single WebSocket connection to the signal source
//
// Lifecycle: Disconnected -> Connecting -> Open -> Closed | Errored
// - One connection attempt per set_up(), no reconnect
// - Handshake payload sent once on open
// - Decoded signals are pushed onto a channel in arrival order
// - Undecodable messages are reported and dropped; the connection stays open

use crate::error::{MonitorError, Result};
use crate::session::protocol::Signal;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Connection state of the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ListenerState {
    /// A connection attempt is in progress or established
    pub fn is_live(self) -> bool {
        matches!(self, ListenerState::Connecting | ListenerState::Open)
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerState::Disconnected => write!(f, "Disconnected"),
            ListenerState::Connecting => write!(f, "Connecting"),
            ListenerState::Open => write!(f, "Open"),
            ListenerState::Closed => write!(f, "Closed"),
            ListenerState::Errored => write!(f, "Errored"),
        }
    }
}

type SharedState = Arc<StdMutex<ListenerState>>;

fn set_state(state: &SharedState, next: ListenerState) {
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    debug!("signal listener {} -> {}", *guard, next);
    *guard = next;
}

struct Connection {
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the connection to the signal source
pub struct SignalListener {
    endpoint: String,
    handshake: String,
    state: SharedState,
    connection: Option<Connection>,
}

impl SignalListener {
    pub fn new(endpoint: impl Into<String>, handshake: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            handshake: handshake.into(),
            state: Arc::new(StdMutex::new(ListenerState::Disconnected)),
            connection: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ListenerState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open one connection attempt and return the stream of decoded signals.
    ///
    /// Rejected with [`MonitorError::AlreadyConnected`] while a previous
    /// connection is still connecting or open.
    pub fn set_up(&mut self) -> Result<mpsc::UnboundedReceiver<Signal>> {
        if self.state().is_live() {
            return Err(MonitorError::AlreadyConnected);
        }

        set_state(&self.state, ListenerState::Connecting);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        let task = tokio::spawn(run_connection(
            self.endpoint.clone(),
            self.handshake.clone(),
            Arc::clone(&self.state),
            signal_tx,
            close_rx,
        ));
        self.connection = Some(Connection { close_tx, task });

        Ok(signal_rx)
    }

    /// Best-effort teardown: send a close frame if open and wait for the
    /// connection task to finish.
    pub async fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let _ = connection.close_tx.send(());
        if let Err(e) = connection.task.await {
            error!("signal connection task failed: {}", e);
            set_state(&self.state, ListenerState::Errored);
        }
    }
}

async fn run_connection(
    endpoint: String,
    handshake: String,
    state: SharedState,
    signal_tx: mpsc::UnboundedSender<Signal>,
    mut close_rx: oneshot::Receiver<()>,
) {
    info!("connecting to signal source at {}", endpoint);

    let ws_stream = tokio::select! {
        biased;
        _ = &mut close_rx => {
            set_state(&state, ListenerState::Closed);
            return;
        }
        result = connect_async(endpoint.as_str()) => match result {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                error!("{}", MonitorError::from(e));
                set_state(&state, ListenerState::Errored);
                return;
            }
        }
    };

    set_state(&state, ListenerState::Open);
    info!("signal connection established");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    if let Err(e) = ws_sender.send(Message::Text(handshake)).await {
        error!("failed to send handshake: {}", MonitorError::from(e));
        set_state(&state, ListenerState::Errored);
        return;
    }

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                if let Err(e) = ws_sender.send(Message::Close(None)).await {
                    debug!("close frame not sent: {}", e);
                }
                set_state(&state, ListenerState::Closed);
                break;
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => deliver(text.as_bytes(), &signal_tx),
                    Some(Ok(Message::Binary(bytes))) => deliver(&bytes, &signal_tx),
                    Some(Ok(Message::Close(frame))) => {
                        info!("signal source closed the connection: {:?}", frame);
                        set_state(&state, ListenerState::Closed);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("{}", MonitorError::from(e));
                        set_state(&state, ListenerState::Errored);
                        break;
                    }
                    None => {
                        info!("signal stream ended");
                        set_state(&state, ListenerState::Closed);
                        break;
                    }
                }
            }
        }
    }
}

fn deliver(payload: &[u8], signal_tx: &mpsc::UnboundedSender<Signal>) {
    match Signal::parse(payload) {
        Ok(signal) => {
            debug!("received signal: {:?}", signal);
            if signal_tx.send(signal).is_err() {
                warn!("no consumer for signals, dropping");
            }
        }
        Err(e) => {
            error!(
                "{} (payload: {})",
                MonitorError::from(e),
                String::from_utf8_lossy(payload)
            );
        }
    }
}
