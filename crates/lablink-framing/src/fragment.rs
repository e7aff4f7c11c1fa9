use std::time::Instant;

use bytes::Bytes;

/// A chunk of received bytes stamped at the moment of receipt.
///
/// The stamp is taken in the receive loop, before the fragment crosses the
/// queue to the consumer. Timeout evaluation therefore sees arrival times,
/// not dequeue times, and queueing latency never distorts continuation gaps.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The received bytes.
    pub payload: Bytes,
    /// When the payload came off the transport.
    pub received_at: Instant,
}

impl Fragment {
    /// Create a fragment stamped with the current time.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            received_at: Instant::now(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
