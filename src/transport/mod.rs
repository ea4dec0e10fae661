//! Push/pull message transport between pipeline stages.
//!
//! [`MessageSource`] yields inbound messages one at a time; [`MessageSink`] forwards to the next
//! stage. Sends are bounded with [`send_with_timeout`].

pub mod channel;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod tcp;


use std::time::Duration;

use async_trait::async_trait;

use crate::wire::Message;

pub use channel::{ChannelSink, ChannelSource, channel};
pub use error::{TransportError, TransportResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSink;
pub use tcp::{PullSocket, PushSocket};

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, msg: Message) -> TransportResult<()>;
}

#[async_trait]
pub trait MessageSource: Send {
    /// Next inbound message; `None` once the source is exhausted.
    async fn recv(&mut self) -> TransportResult<Option<Message>>;
}

/// Sends `msg`, failing with [`TransportError::Timeout`] if `timeout` elapses first.
pub async fn send_with_timeout<S>(sink: &S, msg: Message, timeout: Duration) -> TransportResult<()>
where
    S: MessageSink + ?Sized,
{
    match tokio::time::timeout(timeout, sink.send(msg)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout { timeout }),
    }
}
