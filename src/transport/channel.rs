use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessageSink, MessageSource, TransportError, TransportResult};
use crate::wire::Message;

/// In-process bounded push/pull pair.
pub fn channel(capacity: usize) -> (ChannelSink, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, ChannelSource { rx })
}

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Message>,
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&self, msg: Message) -> TransportResult<()> {
        self.tx.send(msg).await.map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> TransportResult<Option<Message>> {
        Ok(self.rx.recv().await)
    }
}
