use bytes::Bytes;

use crate::error::Result;

/// Capability set every instrument medium provides.
///
/// A transport is a connected byte pipe with explicit lifecycle. It carries
/// no framing of its own; chunk boundaries are whatever the medium happens
/// to deliver, and the layers above turn those chunks into logical answers.
///
/// `receive` blocks until the medium delivers something, so it is meant to
/// be driven from a dedicated thread. [`try_clone`](Transport::try_clone)
/// exists for exactly that split: the receive half moves onto the reader
/// thread while the caller keeps writing through the original. Closing
/// either half must make a blocked `receive` on the other return promptly.
pub trait Transport: Send + 'static {
    /// Establish the connection. Idempotent when already open.
    fn open(&mut self) -> Result<()>;

    /// Tear the connection down, unblocking any pending `receive`.
    fn close(&mut self) -> Result<()>;

    /// Send `data` verbatim. The transport never buffers across calls.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Block until the medium delivers the next chunk.
    ///
    /// An empty chunk signals orderly closure by the remote end; an error
    /// signals failure. Neither is returned twice.
    fn receive(&mut self) -> Result<Bytes>;

    /// Clone this transport sharing the same OS-level connection.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}
