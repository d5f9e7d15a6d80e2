//! Transfer Progress
//!
//! Byte counts reported by a transport and their conversion into the
//! `[0.0, 1.0]` sequence handed to callers.

/// Raw progress report from a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes received so far
    pub received: u64,
    /// Total bytes if the transport knows them
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(received: u64, total: Option<u64>) -> Self {
        Self { received, total }
    }

    /// Progress as a fraction (0.0 - 1.0), if the total is known
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.received as f64 / total as f64).clamp(0.0, 1.0) as f32),
            None => None,
        }
    }
}

/// Turns transport reports into a non-decreasing sequence with exactly one
/// final `1.0`.
///
/// Intermediate reports that reach `1.0` are held back; only [`finish`]
/// emits the terminal value.
///
/// [`finish`]: ProgressTracker::finish
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: f32,
    emitted_any: bool,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a transport report. Returns the value to emit, if any.
    pub fn advance(&mut self, progress: TransferProgress) -> Option<f32> {
        if self.finished {
            return None;
        }
        let fraction = progress.fraction()?;
        if fraction >= 1.0 {
            return None;
        }
        if self.emitted_any && fraction <= self.last {
            return None;
        }
        self.last = fraction;
        self.emitted_any = true;
        Some(fraction)
    }

    /// The final `1.0`, returned at most once.
    pub fn finish(&mut self) -> Option<f32> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.last = 1.0;
        Some(1.0)
    }

    pub fn last(&self) -> f32 {
        self.last
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
