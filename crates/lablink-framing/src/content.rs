use std::time::Duration;

use bytes::Bytes;

use crate::stop::{Disposition, Verdict};

/// Stop once a fixed number of bytes has been collected.
///
/// Surplus past the requested count is never discarded: it is deferred and
/// becomes the head of the next read. No clock is involved; a device that
/// stays short of the count leaves the read waiting.
#[derive(Debug, Clone)]
pub struct Length {
    count: usize,
}

impl Length {
    /// Stop after exactly `count` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "length stop condition needs at least one byte");
        Self { count }
    }

    /// Start a read call. Length has no clock, so there is no wait bound.
    pub fn arm(&mut self) -> Option<Duration> {
        None
    }

    /// Judge the accumulation collected so far this call.
    pub fn evaluate(&self, accumulated: &[u8]) -> Verdict {
        if accumulated.len() >= self.count {
            Verdict::Stop(Disposition::Split {
                keep: self.count,
                defer_from: self.count,
            })
        } else {
            Verdict::Continue { bound: None }
        }
    }
}

/// Stop when a terminator byte sequence appears in the stream.
///
/// The terminator may arrive split across fragments; the scan backs up by
/// one terminator length before resuming, so a straddled match is still
/// found without rescanning the whole accumulation. Everything after the
/// terminator is deferred to the next read. The terminator itself is always
/// consumed; whether it appears in the returned bytes is configurable.
#[derive(Debug, Clone)]
pub struct Termination {
    sequence: Bytes,
    inclusive: bool,
    scanned: usize,
}

impl Termination {
    /// Stop at the first occurrence of `sequence`, excluding it from the
    /// returned bytes.
    ///
    /// # Panics
    ///
    /// Panics if `sequence` is empty.
    pub fn new(sequence: impl Into<Bytes>) -> Self {
        let sequence = sequence.into();
        assert!(
            !sequence.is_empty(),
            "termination sequence must not be empty"
        );
        Self {
            sequence,
            inclusive: false,
            scanned: 0,
        }
    }

    /// Whether the terminator appears in the returned bytes.
    pub fn with_inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    /// Start a read call: reset the scan cursor. No clock, no wait bound.
    pub fn arm(&mut self) -> Option<Duration> {
        self.scanned = 0;
        None
    }

    /// Judge the accumulation collected so far this call.
    ///
    /// Accumulations must grow monotonically between [`arm`](Self::arm)
    /// calls; the scan picks up where the previous evaluation left off.
    pub fn evaluate(&mut self, accumulated: &[u8]) -> Verdict {
        // Resume just far enough back to catch a terminator straddling the
        // previous fragment boundary.
        let resume = self.scanned.saturating_sub(self.sequence.len() - 1);
        if let Some(offset) = find(&accumulated[resume..], &self.sequence) {
            let start = resume + offset;
            let end = start + self.sequence.len();
            return Verdict::Stop(Disposition::Split {
                keep: if self.inclusive { end } else { start },
                defer_from: end,
            });
        }
        self.scanned = accumulated.len();
        Verdict::Continue { bound: None }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops_at(verdict: Verdict) -> (usize, usize) {
        match verdict {
            Verdict::Stop(Disposition::Split { keep, defer_from }) => (keep, defer_from),
            other => panic!("expected a split stop, got {other:?}"),
        }
    }

    #[test]
    fn length_waits_until_the_count_is_reached() {
        let length = Length::new(4);
        assert_eq!(length.evaluate(b"ab"), Verdict::Continue { bound: None });
        assert_eq!(
            length.evaluate(b"abcd"),
            Verdict::Stop(Disposition::Split {
                keep: 4,
                defer_from: 4
            })
        );
    }

    #[test]
    fn length_defers_surplus_bytes() {
        let length = Length::new(4);
        let (keep, defer_from) = stops_at(length.evaluate(b"abcdefg"));
        assert_eq!((keep, defer_from), (4, 4));
    }

    #[test]
    #[should_panic(expected = "at least one byte")]
    fn zero_length_is_rejected() {
        let _ = Length::new(0);
    }

    #[test]
    fn terminator_found_within_one_fragment() {
        let mut termination = Termination::new(&b"\n"[..]);
        termination.arm();
        let (keep, defer_from) = stops_at(termination.evaluate(b"ok\nrest"));
        assert_eq!((keep, defer_from), (2, 3));
    }

    #[test]
    fn inclusive_terminator_is_kept_in_the_returned_bytes() {
        let mut termination = Termination::new(&b"\n"[..]).with_inclusive(true);
        termination.arm();
        let (keep, defer_from) = stops_at(termination.evaluate(b"ok\nrest"));
        assert_eq!((keep, defer_from), (3, 3));
    }

    #[test]
    fn terminator_straddling_two_fragments_is_found() {
        let mut termination = Termination::new(&b"\r\n"[..]);
        termination.arm();

        assert_eq!(
            termination.evaluate(b"ok\r"),
            Verdict::Continue { bound: None }
        );
        let (keep, defer_from) = stops_at(termination.evaluate(b"ok\r\nnext"));
        assert_eq!((keep, defer_from), (2, 4));
    }

    #[test]
    fn scan_resumes_instead_of_rescanning() {
        let mut termination = Termination::new(&b";"[..]);
        termination.arm();

        // A large quiet prefix, then the terminator in a later fragment.
        let mut acc = vec![b'x'; 4096];
        assert_eq!(
            termination.evaluate(&acc),
            Verdict::Continue { bound: None }
        );
        acc.extend_from_slice(b"done;tail");
        let (keep, defer_from) = stops_at(termination.evaluate(&acc));
        assert_eq!((keep, defer_from), (4100, 4101));
    }

    #[test]
    fn first_of_several_terminators_wins() {
        let mut termination = Termination::new(&b"\n"[..]);
        termination.arm();
        let (keep, defer_from) = stops_at(termination.evaluate(b"a\nb\nc"));
        assert_eq!((keep, defer_from), (1, 2));
    }

    #[test]
    fn rearming_resets_the_scan_cursor() {
        let mut termination = Termination::new(&b"\n"[..]);
        termination.arm();
        assert_eq!(
            termination.evaluate(b"no end"),
            Verdict::Continue { bound: None }
        );

        termination.arm();
        let (keep, defer_from) = stops_at(termination.evaluate(b"x\n"));
        assert_eq!((keep, defer_from), (1, 2));
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn empty_terminator_is_rejected() {
        let _ = Termination::new(Bytes::new());
    }
}
