//! TCP push/pull sockets.
//!
//! Frames are a big-endian `u32` payload length followed by the rkyv-encoded [`Message`].

use std::io::ErrorKind;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{MessageSink, MessageSource, TransportResult};
use crate::constants::MAX_FRAME_BYTES;
use crate::wire::{Message, WireError, decode_message, encode_message};

const INBOUND_QUEUE: usize = 64;

pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode_message(msg)?;
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        len: payload.len(),
        max: MAX_FRAME_BYTES,
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame; `None` on a clean end of stream between frames.
pub async fn read_frame<R>(reader: &mut R) -> TransportResult<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        }
        .into());
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(decode_message(&payload)?))
}

/// Inbound socket: binds and accepts any number of upstream connections.
pub struct PullSocket {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<Message>,
    accept_task: JoinHandle<()>,
}

impl PullSocket {
    pub async fn bind(addr: &str) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let accept_task = tokio::spawn(accept_loop(listener, tx));

        info!(addr = %local_addr, "Pull socket listening");
        Ok(Self {
            local_addr,
            rx,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for PullSocket {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

#[async_trait]
impl MessageSource for PullSocket {
    async fn recv(&mut self) -> TransportResult<Option<Message>> {
        Ok(self.rx.recv().await)
    }
}

async fn accept_loop(listener: TcpListener, tx: mpsc::Sender<Message>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(peer = %peer, "Upstream connected");
                tokio::spawn(read_connection(stream, peer, tx.clone()));
            }
            Err(e) => warn!(error = %e, "Accept failed"),
        }
    }
}

async fn read_connection(mut stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Message>) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(msg)) => {
                if tx.send(msg).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                debug!(peer = %peer, "Upstream disconnected");
                return;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping upstream connection");
                return;
            }
        }
    }
}

/// Outbound socket: connects on first send and reconnects after a failed or abandoned write.
pub struct PushSocket {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl PushSocket {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl MessageSink for PushSocket {
    async fn send(&self, msg: Message) -> TransportResult<()> {
        let mut guard = self.stream.lock().await;
        // Out of the slot while writing: a cancelled or failed write drops the connection.
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => {
                let stream = TcpStream::connect(&self.addr).await?;
                stream.set_nodelay(true)?;
                debug!(addr = %self.addr, "Push socket connected");
                stream
            }
        };

        write_frame(&mut stream, &msg).await?;
        *guard = Some(stream);
        Ok(())
    }
}
