use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use nodeflow::errors::Result;
use nodeflow::session::{MessageSink, MessageSource, ServerMessage};

/// Inbound half backed by a channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
}

impl MessageSource for ChannelSource {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.rx.recv().await) })
    }
}

/// Outbound half backed by a channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl MessageSink for ChannelSink {
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.tx
                .send(text)
                .map_err(|e| anyhow::anyhow!("session client gone: {e}"))?;
            Ok(())
        })
    }
}

/// The caller's end of a channel session.
pub struct SessionClient {
    tx: Option<mpsc::Sender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl SessionClient {
    pub async fn send(&self, message: serde_json::Value) {
        self.send_text(&message.to_string()).await;
    }

    pub async fn send_text(&self, text: &str) {
        self.tx
            .as_ref()
            .expect("session client already hung up")
            .send(text.to_string())
            .await
            .expect("session handler gone");
    }

    /// Close the inbound side, as a caller disconnecting would.
    pub fn hang_up(&mut self) {
        self.tx = None;
    }

    /// Next server message, or `None` once the handler has exited.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let text = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("no server message within 5 seconds")?;
        Some(serde_json::from_str(&text).expect("server sent invalid JSON"))
    }

    /// Skip messages until one matches `pred`.
    pub async fn recv_until<F>(&mut self, mut pred: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let message = self.recv().await.expect("session ended early");
            if pred(&message) {
                return message;
            }
        }
    }
}

/// A connected client plus the source/sink pair to hand to the session
/// handler.
pub fn channel_session() -> (SessionClient, ChannelSource, ChannelSink) {
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    (
        SessionClient {
            tx: Some(in_tx),
            rx: out_rx,
        },
        ChannelSource { rx: in_rx },
        ChannelSink { tx: out_tx },
    )
}
