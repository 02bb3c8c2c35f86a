//! Fixed-capacity ring buffer of recent output lines.

use crate::types::{OutputLine, StreamKind};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Ring buffer retaining the most recent `capacity` lines. Oldest lines are
/// dropped first on overflow; the drop count is tracked so callers can tell
/// when the window is incomplete.
#[derive(Debug)]
pub struct OutputBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    lines: VecDeque<OutputLine>,
    next_seq: u64,
    dropped: u64,
}

impl OutputBuffer {
    /// Create a buffer with the given capacity. Capacity must be non-zero;
    /// configuration validation enforces this before construction.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                lines: VecDeque::with_capacity(capacity.min(1024)),
                next_seq: 1,
                dropped: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&self, stream: StreamKind, line: String) {
        let mut inner = self.inner.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;

        if inner.lines.len() == self.capacity {
            inner.lines.pop_front();
            inner.dropped += 1;
        }

        inner.lines.push_back(OutputLine {
            seq,
            timestamp: Utc::now(),
            stream,
            line,
        });
    }

    /// The most recent `n` lines, oldest first. `n` larger than the retained
    /// window returns everything retained.
    pub fn recent(&self, n: usize) -> Vec<OutputLine> {
        let inner = self.inner.lock();
        let skip = inner.lines.len().saturating_sub(n);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    /// Number of lines currently retained.
    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }

    /// Total lines evicted since the last clear.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Discard all retained lines; sequence numbering restarts.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lines.clear();
        inner.next_seq = 1;
        inner.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_recent() {
        let buffer = OutputBuffer::new(10);
        buffer.push(StreamKind::Stdout, "one".to_string());
        buffer.push(StreamKind::Stderr, "two".to_string());

        let lines = buffer.recent(10);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, "one");
        assert_eq!(lines[0].stream, StreamKind::Stdout);
        assert_eq!(lines[1].line, "two");
        assert_eq!(lines[1].stream, StreamKind::Stderr);
        assert_eq!(lines[0].seq, 1);
        assert_eq!(lines[1].seq, 2);
    }

    #[test]
    fn test_overflow_drops_oldest_first() {
        let buffer = OutputBuffer::new(3);
        for i in 0..5 {
            buffer.push(StreamKind::Stdout, format!("line {}", i));
        }

        let lines = buffer.recent(10);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, "line 2");
        assert_eq!(lines[2].line, "line 4");
        assert_eq!(buffer.dropped(), 2);
    }

    #[test]
    fn test_recent_returns_most_recent_window() {
        let buffer = OutputBuffer::new(10);
        for i in 0..6 {
            buffer.push(StreamKind::Stdout, format!("line {}", i));
        }

        let lines = buffer.recent(2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, "line 4");
        assert_eq!(lines[1].line, "line 5");
    }

    #[test]
    fn test_clear_resets_sequence() {
        let buffer = OutputBuffer::new(4);
        buffer.push(StreamKind::Stdout, "old".to_string());
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped(), 0);

        buffer.push(StreamKind::Stdout, "new".to_string());
        assert_eq!(buffer.recent(1)[0].seq, 1);
    }
}
