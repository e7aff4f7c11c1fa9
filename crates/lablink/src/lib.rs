//! Timeout- and content-framed instrument I/O over TCP and UDP.
//!
//! lablink talks to lab instruments whose replies arrive at an unpredictable
//! pace: a byte stream is framed into logical answers by timing gaps, byte
//! counts, or terminator sequences rather than by anything the wire itself
//! provides.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte-level endpoints (TCP, UDP) behind one blocking trait
//! - [`framing`] — Timestamped fragment queue and the stop-condition engine
//! - [`adapter`] — Read/write/query orchestration tying the two together

/// Re-export transport types.
pub mod transport {
    pub use lablink_transport::*;
}

/// Re-export framing types.
pub mod framing {
    pub use lablink_framing::*;
}

/// Re-export adapter types.
pub mod adapter {
    pub use lablink_adapter::*;
}
