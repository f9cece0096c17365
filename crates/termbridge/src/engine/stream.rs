//! JSON-RPC 2.0 over newline-delimited JSON.
//!
//! Works over any tokio byte stream: a Unix or TCP socket, a child process's
//! stdio, or a WebSocket adapter feeding a browser page that hosts the
//! terminal engine. Requests flow out; responses and event notifications flow
//! back on the same stream.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use termbridge_common::mutex_lock_or_recover;
use termbridge_protocol::EngineError;
use termbridge_protocol::EngineNotification;
use termbridge_protocol::Incoming;
use termbridge_protocol::IncomingFrame;
use termbridge_protocol::RpcRequest;
use termbridge_protocol::EVENT_METHOD;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::TerminalEngine;
use crate::config::BridgeConfig;

type Reply = oneshot::Sender<Result<Value, EngineError>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Default)]
struct PendingCalls {
    waiters: HashMap<u64, Reply>,
    closed: bool,
}

impl PendingCalls {
    fn fail_all(&mut self) {
        self.closed = true;
        for (_, reply) in self.waiters.drain() {
            let _ = reply.send(Err(EngineError::Disconnected));
        }
    }
}

pub struct StreamEngine {
    writer: tokio::sync::Mutex<BoxedWriter>,
    pending: Arc<Mutex<PendingCalls>>,
    next_id: AtomicU64,
    max_frame_bytes: usize,
    reader: JoinHandle<()>,
}

impl StreamEngine {
    /// Starts the reader task and returns the engine plus the receiving end
    /// of its event channel. Pass the receiver to
    /// [`TerminalBridge::spawn_event_pump`](crate::TerminalBridge::spawn_event_pump).
    /// The reader never waits on the channel: while it is full, further
    /// notifications are dropped with a warning so replies keep flowing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<R, W>(
        reader: R,
        writer: W,
        config: &BridgeConfig,
    ) -> (Self, mpsc::Receiver<EngineNotification>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity());
        let pending = Arc::new(Mutex::new(PendingCalls::default()));
        let event_method = if config.namespace().is_empty() {
            EVENT_METHOD.to_string()
        } else {
            format!("{}.{}", config.namespace(), EVENT_METHOD)
        };

        let reader = tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            events_tx,
            event_method,
            config.max_frame_bytes(),
        ));

        let engine = Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            max_frame_bytes: config.max_frame_bytes(),
            reader,
        };
        (engine, events_rx)
    }

    /// False once the stream has closed; every later call fails.
    pub fn is_connected(&self) -> bool {
        !mutex_lock_or_recover(&self.pending).closed
    }
}

/// Removes a call's waiter once the caller stops waiting, whether it was
/// answered, failed, or dropped mid-flight.
struct WaiterGuard<'a> {
    pending: &'a Mutex<PendingCalls>,
    id: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        mutex_lock_or_recover(self.pending).waiters.remove(&self.id);
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        self.reader.abort();
        mutex_lock_or_recover(&self.pending).fail_all();
    }
}

#[async_trait]
impl TerminalEngine for StreamEngine {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut frame = serde_json::to_vec(&RpcRequest::new(id, method, params))?;
        if frame.len() > self.max_frame_bytes {
            return Err(EngineError::FrameTooLarge {
                size: frame.len(),
                limit: self.max_frame_bytes,
            });
        }
        frame.push(b'\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = mutex_lock_or_recover(&self.pending);
            if pending.closed {
                return Err(EngineError::Disconnected);
            }
            pending.waiters.insert(id, reply_tx);
        }
        let _waiter = WaiterGuard {
            pending: &self.pending,
            id,
        };

        trace!(id, method, "Sending engine request");
        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&frame).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            return Err(EngineError::Io(e));
        }

        reply_rx.await.unwrap_or(Err(EngineError::Disconnected))
    }
}

async fn read_loop<R>(
    reader: R,
    pending: Arc<Mutex<PendingCalls>>,
    events: mpsc::Sender<EngineNotification>,
    event_method: String,
    max_frame_bytes: usize,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        match read_frame(&mut reader, &mut line, max_frame_bytes).await {
            Ok(0) => {
                debug!("Engine stream closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Engine stream failed; disconnecting");
                break;
            }
        }

        let text = line.trim_ascii();
        if text.is_empty() {
            continue;
        }

        let frame: IncomingFrame = match serde_json::from_slice(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Discarding malformed engine frame");
                continue;
            }
        };

        match frame.classify(&event_method) {
            Ok(Incoming::Response(response)) => {
                let waiter = mutex_lock_or_recover(&pending).waiters.remove(&response.id);
                match waiter {
                    Some(reply) => {
                        let _ = reply.send(response.into_result());
                    }
                    None => warn!(id = response.id, "Response for unknown engine request"),
                }
            }
            Ok(Incoming::Notification(notification)) => match events.try_send(notification) {
                Ok(()) => {}
                Err(TrySendError::Full(dropped)) => warn!(
                    terminal_id = %dropped.terminal_id,
                    event = %dropped.event.kind(),
                    "Event queue full; dropping engine event"
                ),
                Err(TrySendError::Closed(_)) => {
                    trace!("Event receiver dropped; discarding notification");
                }
            },
            Err(e) => warn!(error = %e, "Discarding engine frame"),
        }
    }

    mutex_lock_or_recover(&pending).fail_all();
}

/// Reads one line into `buf`. Returns 0 at end of stream.
async fn read_frame<R>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
    max_frame_bytes: usize,
) -> Result<usize, EngineError>
where
    R: AsyncRead + Unpin,
{
    let limit = max_frame_bytes as u64 + 1;
    let read = reader.take(limit).read_until(b'\n', buf).await?;
    let content = buf.len() - usize::from(buf.ends_with(b"\n"));
    if content > max_frame_bytes {
        return Err(EngineError::FrameTooLarge {
            size: content,
            limit: max_frame_bytes,
        });
    }
    Ok(read)
}
