//! Framed read/write/query orchestration over instrument transports.
//!
//! An [`Adapter`] pairs any [`Transport`](lablink_transport::Transport) with
//! a [`StopCondition`](lablink_framing::StopCondition) and turns the raw
//! chunk stream into logical reads: a background loop stamps and queues
//! whatever the medium delivers, while the calling thread decides when the
//! answer is complete and what to do with surplus bytes.

pub mod adapter;
pub mod error;

pub use adapter::Adapter;
pub use error::{Error, Result};
