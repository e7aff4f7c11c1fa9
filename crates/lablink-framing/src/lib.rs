//! Timestamped fragment queue and stop-condition framing for instrument reads.
//!
//! This is the core value-add layer of lablink. Instruments answer over byte
//! streams with no record structure, so every logical read is framed by rules
//! instead of lengths on the wire:
//! - A receive loop stamps each chunk at the moment it arrives and hands it
//!   over through a [`TimedQueue`]
//! - A [`StopCondition`] decides, chunk by chunk, when the read is complete
//!   and what happens to the bytes collected so far
//!
//! Time-based framing lives in [`Timeout`]; content-based framing in
//! [`Length`] and [`Termination`].

pub mod content;
pub mod fragment;
pub mod queue;
pub mod stop;
pub mod timeout;

pub use content::{Length, Termination};
pub use fragment::Fragment;
pub use queue::{Dequeued, TimedQueue};
pub use stop::{DataStrategy, Disposition, ReadEvent, StopCondition, TimeoutKind, Verdict};
pub use timeout::Timeout;
