use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{MessageSink, TransportResult};
use crate::wire::Message;

/// Records forwarded messages. A stalled sink never completes a send.
#[derive(Debug, Default)]
pub struct MockSink {
    sent: Mutex<Vec<Message>>,
    stalled: AtomicBool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stalled() -> Self {
        let sink = Self::default();
        sink.set_stalled(true);
        sink
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageSink for MockSink {
    async fn send(&self, msg: Message) -> TransportResult<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.sent.lock().push(msg);
        Ok(())
    }
}
