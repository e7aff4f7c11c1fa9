use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use lablink_framing::{Dequeued, Disposition, ReadEvent, StopCondition, TimedQueue, Verdict};
use lablink_transport::{Transport, TransportError};

use crate::error::{Error, Result};

/// Framed instrument endpoint: one transport, one stop condition.
///
/// The adapter owns the connection lifecycle. A background receive loop
/// stamps and queues every chunk the medium delivers; `read` drains that
/// queue under the stop condition's direction and `write` sends commands
/// verbatim. Bytes a stop decision leaves over are deferred and become the
/// head of the next read, surviving reconnects.
///
/// All calls take `&mut self`, so at most one read or query is ever in
/// flight per adapter; overlapping calls are a compile error rather than a
/// runtime hazard.
pub struct Adapter<T: Transport> {
    transport: T,
    stop_condition: StopCondition,
    deferred: BytesMut,
    connection: Option<Connection>,
}

struct Connection {
    queue: Arc<TimedQueue>,
    failure: Arc<Mutex<Option<TransportError>>>,
    reader: Option<JoinHandle<()>>,
}

impl<T: Transport> Adapter<T> {
    /// Pair a transport with a stop condition.
    ///
    /// The transport may be closed; the first `read`, `write`, or `query`
    /// connects on demand.
    pub fn new(transport: T, stop_condition: impl Into<StopCondition>) -> Self {
        Self {
            transport,
            stop_condition: stop_condition.into(),
            deferred: BytesMut::new(),
            connection: None,
        }
    }

    /// Replace the stop condition for subsequent reads.
    pub fn set_stop_condition(&mut self, stop_condition: impl Into<StopCondition>) {
        self.stop_condition = stop_condition.into();
    }

    /// Whether a connection (and its receive loop) is currently up.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect and start the receive loop. Idempotent while connected.
    pub fn open(&mut self) -> Result<()> {
        self.ensure_open().map(drop)
    }

    /// Close the connection and reap the receive loop.
    ///
    /// Closing the transport unblocks the loop's pending receive, so the
    /// join is prompt. Deferred bytes are kept; they were received and a
    /// later read may still want them.
    pub fn close(&mut self) -> Result<()> {
        self.transport.close()?;
        if let Some(mut connection) = self.connection.take() {
            if let Some(reader) = connection.reader.take() {
                let _ = reader.join();
            }
            debug!("adapter closed");
        }
        Ok(())
    }

    /// Send `data` verbatim, connecting first if necessary.
    ///
    /// Never flushes pending receive state; a stale answer in the queue
    /// stays there. Use [`query`](Self::query) for a clean exchange.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.transport.write(data)?;
        Ok(())
    }

    /// Collect one logical answer under the stop condition.
    ///
    /// Deferred bytes from earlier reads are considered first and may
    /// complete the read on their own. Otherwise fragments are drained from
    /// the receive queue, each one re-evaluated against the stop condition,
    /// until it rules the answer complete. A configured total timeout is
    /// the only way to cut a read short from outside; there is no separate
    /// cancellation mechanism.
    ///
    /// If the receive loop has died, the error surfaces here once the
    /// queue is drained: [`Error::ConnectionLost`] wrapping the transport
    /// failure, or [`Error::Closed`] after an orderly remote close. Bytes
    /// collected by the interrupted call are deferred, not lost.
    pub fn read(&mut self) -> Result<Bytes> {
        let queue = self.ensure_open()?;
        let mut bound = self.stop_condition.arm(Instant::now());
        let mut collected = BytesMut::new();

        if !self.deferred.is_empty() {
            collected = std::mem::take(&mut self.deferred);
            let now = Instant::now();
            match self
                .stop_condition
                .evaluate(&collected, ReadEvent::Data { at: now }, now)
            {
                Verdict::Stop(disposition) => return Ok(self.apply(disposition, collected)),
                Verdict::Continue { bound: next } => bound = next,
            }
        }

        loop {
            match queue.get(bound) {
                Dequeued::Fragment(fragment) => {
                    collected.extend_from_slice(&fragment.payload);
                    let now = Instant::now();
                    let event = ReadEvent::Data {
                        at: fragment.received_at,
                    };
                    match self.stop_condition.evaluate(&collected, event, now) {
                        Verdict::Stop(disposition) => {
                            return Ok(self.apply(disposition, collected))
                        }
                        Verdict::Continue { bound: next } => bound = next,
                    }
                }
                Dequeued::Expired => {
                    let now = Instant::now();
                    match self
                        .stop_condition
                        .evaluate(&collected, ReadEvent::Expired, now)
                    {
                        Verdict::Stop(disposition) => {
                            return Ok(self.apply(disposition, collected))
                        }
                        Verdict::Continue { bound: next } => bound = next,
                    }
                }
                Dequeued::Disconnected => {
                    if !collected.is_empty() {
                        self.deferred = collected;
                    }
                    return Err(self.connection_lost());
                }
            }
        }
    }

    /// Flush stale receive state, send `data`, and read the answer.
    pub fn query(&mut self, data: &[u8]) -> Result<Bytes> {
        self.flush_read();
        self.write(data)?;
        self.read()
    }

    /// Drop everything received but not yet consumed: the queued fragments
    /// and the deferred buffer both.
    pub fn flush_read(&mut self) {
        self.deferred.clear();
        if let Some(connection) = &self.connection {
            connection.queue.clear();
        }
    }

    fn ensure_open(&mut self) -> Result<Arc<TimedQueue>> {
        if let Some(connection) = &self.connection {
            return Ok(Arc::clone(&connection.queue));
        }
        self.transport.open()?;
        let receiver = self.transport.try_clone()?;
        let queue = Arc::new(TimedQueue::new());
        let failure: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));
        let reader = spawn_receive_loop(receiver, Arc::clone(&queue), Arc::clone(&failure))
            .map_err(TransportError::from)?;
        self.connection = Some(Connection {
            queue: Arc::clone(&queue),
            failure,
            reader: Some(reader),
        });
        debug!("adapter connected, receive loop running");
        Ok(queue)
    }

    fn apply(&mut self, disposition: Disposition, mut collected: BytesMut) -> Bytes {
        match disposition {
            Disposition::Discard => Bytes::new(),
            Disposition::Return => collected.freeze(),
            Disposition::Store => {
                self.deferred = collected;
                Bytes::new()
            }
            Disposition::Split { keep, defer_from } => {
                self.deferred = collected.split_off(defer_from);
                collected.truncate(keep);
                collected.freeze()
            }
        }
    }

    fn connection_lost(&mut self) -> Error {
        // The loop is already gone; release the transport so a later call
        // can reconnect, without masking the original failure.
        let _ = self.transport.close();
        let failure = match self.connection.take() {
            Some(mut connection) => {
                if let Some(reader) = connection.reader.take() {
                    let _ = reader.join();
                }
                connection
                    .failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
            }
            None => None,
        };
        match failure {
            Some(source) => Error::ConnectionLost { source },
            None => Error::Closed,
        }
    }
}

impl<T: Transport> Drop for Adapter<T> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            let _ = self.close();
        }
    }
}

fn spawn_receive_loop<T: Transport>(
    mut receiver: T,
    queue: Arc<TimedQueue>,
    failure: Arc<Mutex<Option<TransportError>>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("lablink-receive".to_string())
        .spawn(move || {
            loop {
                match receiver.receive() {
                    Ok(chunk) if chunk.is_empty() => {
                        debug!("receive loop ended: orderly closure");
                        break;
                    }
                    Ok(chunk) => queue.put(chunk),
                    Err(err) => {
                        debug!(error = %err, "receive loop ended on transport error");
                        *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                        break;
                    }
                }
            }
            queue.disconnect();
        })
}
