//! Session actor
//!
//! Wraps one accepted connection and isolates its line-oriented I/O:
//! a read loop decodes lines into inbound `Message`s and a write loop
//! encodes outbound `Message`s back onto the connection. A session never
//! touches room or registry state.

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::client::Client;
use crate::config::ServerConfig;
use crate::message::Message;
use crate::types::SessionId;

/// Channel buffer size for a session's inbound lines
const INBOUND_BUFFER_SIZE: usize = 32;

/// Time a shut down session gets to flush its remaining outbound lines
const SHUTDOWN_DRAIN: Duration = Duration::from_millis(250);

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// An accepted connection that is not yet serving
pub struct Session {
    id: SessionId,
    reader: Reader,
    writer: Writer,
}

impl Session {
    /// Wrap a connection and assign it a fresh id
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id: SessionId::new(),
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Replace the id while the session is still inert
    pub(crate) fn reassign_id(&mut self) {
        self.id = SessionId::new();
    }

    /// Start the read and write loops
    ///
    /// Returns the registry-side handle (outbound queue and shutdown signal)
    /// and the inbound queue. The inbound queue closes when the read loop ends.
    pub fn serve(self, config: &ServerConfig) -> (Client, mpsc::Receiver<Message>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER_SIZE);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer);
        let shutdown = CancellationToken::new();

        tokio::spawn(read_loop(
            self.id,
            self.reader,
            config.max_line_length,
            inbound_tx,
            shutdown.clone(),
        ));
        tokio::spawn(write_loop(
            self.id,
            self.writer,
            outbound_rx,
            shutdown.clone(),
        ));

        (Client::new(self.id, outbound_tx, shutdown), inbound_rx)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Connection -> inbound queue
async fn read_loop(
    id: SessionId,
    reader: Reader,
    max_line_length: usize,
    inbound: mpsc::Sender<Message>,
    shutdown: CancellationToken,
) {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length));

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Read loop for {} cancelled", id);
                break;
            }
            line = lines.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                if inbound.send(Message::new(id, line.trim())).await.is_err() {
                    debug!("Inbound queue closed, ending read loop for {}", id);
                    break;
                }
            }
            Some(Err(e)) => {
                error!("Session {} read error: {}", id, e);
                break;
            }
            None => {
                debug!("Session {} reached end of stream", id);
                break;
            }
        }
    }
}

/// Outbound queue -> connection
///
/// Runs until the outbound queue closes or the session is shut down, then
/// gets at most `SHUTDOWN_DRAIN` to flush what is left before the
/// connection is dropped.
async fn write_loop(
    id: SessionId,
    writer: Writer,
    mut outbound: mpsc::Receiver<Message>,
    shutdown: CancellationToken,
) {
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    loop {
        let msg = tokio::select! {
            biased;
            msg = outbound.recv() => msg,
            _ = shutdown.cancelled() => break,
        };
        let Some(msg) = msg else {
            debug!("Outbound queue closed for {}", id);
            break;
        };

        // send() flushes after every line; a line cut off by shutdown stays
        // buffered in the sink for the drain below
        tokio::select! {
            biased;
            result = sink.send(msg.text.as_str()) => {
                if let Err(e) = result {
                    error!("Session {} write error: {} ({:?})", id, e, msg.text);
                    return;
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }

    let drain = async {
        while let Ok(msg) = outbound.try_recv() {
            SinkExt::<&str>::feed(&mut sink, msg.text.as_str()).await?;
        }
        SinkExt::<&str>::close(&mut sink).await
    };
    match tokio::time::timeout(SHUTDOWN_DRAIN, drain).await {
        Ok(Ok(())) => debug!("Write loop for {} closed the connection", id),
        Ok(Err(e)) => debug!("Session {} close error: {}", id, e),
        Err(_) => debug!("Session {} peer not reading, dropping connection", id),
    }
}
