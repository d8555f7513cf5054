use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// In-process signal source that accepts a single WebSocket client.
///
/// Inbound client messages are collected; outbound messages are pushed with
/// `send_text` / `send_binary` / `close`. The server task is aborted on drop.
pub struct SignalServer {
    url: String,
    outbound_tx: mpsc::UnboundedSender<Message>,
    inbound_rx: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl SignalServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test signal server");
        let addr = listener.local_addr().expect("local addr");

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(ws_stream) = accept_async(stream).await else {
                return;
            };
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            loop {
                tokio::select! {
                    Some(msg) = outbound_rx.recv() => {
                        if ws_sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let _ = inbound_tx.send(text);
                            }
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }
        });

        Self {
            url: format!("ws://{}", addr),
            outbound_tx,
            inbound_rx,
            task,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next text message sent by the client
    pub async fn next_inbound(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.inbound_rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn send_text(&self, text: &str) {
        let _ = self.outbound_tx.send(Message::Text(text.to_string()));
    }

    pub fn send_binary(&self, bytes: &[u8]) {
        let _ = self.outbound_tx.send(Message::Binary(bytes.to_vec()));
    }

    pub fn close(&self) {
        let _ = self.outbound_tx.send(Message::Close(None));
    }
}

impl Drop for SignalServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A localhost port with nothing listening on it
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
