//! Instrument transport abstraction.
//!
//! Provides a unified interface over the media instruments actually hang off:
//! - TCP sockets (LAN instruments, terminal servers)
//! - UDP sockets (Unix-like platforms)
//!
//! This is the lowest layer of lablink. Everything else builds on the
//! [`Transport`] capability set defined here: open, close, write, and a
//! blocking receive that the read loop drives from its own thread. Serial
//! lines and bus bridges plug in by implementing the same trait.

pub mod descriptor;
pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::Tcp;
pub use traits::Transport;

#[cfg(unix)]
pub use udp::Udp;
