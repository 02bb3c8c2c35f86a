//! Async stream readers feeding the ring buffer.

use crate::buffer::OutputBuffer;
use crate::types::StreamKind;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Spawn a reader task that consumes `stream` line by line into `buffer`
/// until EOF or cancellation.
///
/// EOF is the normal end: the child exited and its pipe closed. Cancellation
/// covers supervisor-initiated teardown while the child is still alive.
pub fn collect_stream(
    buffer: Arc<OutputBuffer>,
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(stream = %kind, "output reader started");
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();
        let mut collected = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(stream = %kind, "output reader cancelled");
                    break;
                }
                result = lines.next_line() => {
                    match result {
                        Ok(Some(line)) => {
                            collected += 1;
                            buffer.push(kind, line);
                        }
                        Ok(None) => {
                            debug!(stream = %kind, "output stream ended");
                            break;
                        }
                        Err(e) => {
                            error!(stream = %kind, error = %e, "error reading output stream");
                            break;
                        }
                    }
                }
            }
        }

        debug!(stream = %kind, lines = collected, "output reader finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_until_eof() {
        let buffer = Arc::new(OutputBuffer::new(10));
        let data: &'static [u8] = b"first\nsecond\nthird\n";

        let handle = collect_stream(
            Arc::clone(&buffer),
            data,
            StreamKind::Stdout,
            CancellationToken::new(),
        );
        handle.await.unwrap();

        let lines = buffer.recent(10);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, "first");
        assert_eq!(lines[2].line, "third");
    }

    #[tokio::test]
    async fn test_collect_respects_capacity() {
        let buffer = Arc::new(OutputBuffer::new(2));
        let data: &'static [u8] = b"a\nb\nc\nd\n";

        collect_stream(
            Arc::clone(&buffer),
            data,
            StreamKind::Stderr,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let lines = buffer.recent(10);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, "c");
        assert_eq!(lines[1].line, "d");
        assert_eq!(buffer.dropped(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_reader() {
        let buffer = Arc::new(OutputBuffer::new(10));
        let (_tx, rx) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();

        let handle = collect_stream(Arc::clone(&buffer), rx, StreamKind::Stdout, cancel.clone());
        cancel.cancel();
        handle.await.unwrap();

        assert!(buffer.is_empty());
    }
}
