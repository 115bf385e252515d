//! Caller-supplied handlers for stream events

use crate::error::ClientError;

/// Typed handler set invoked by the ingestor, in record arrival order.
///
/// Handlers are awaited from the processing loop; the next chunk is not
/// requested until the current one is fully dispatched, so a handler must
/// not suspend indefinitely. All methods default to no-ops.
#[async_trait::async_trait]
pub trait EventSink: Send {
    /// The job has started producing output.
    async fn on_start(&mut self, _message: &str) {}

    /// One progress line.
    async fn on_log(&mut self, _message: &str) {}

    /// Terminal: the job completed. The session closes after this call.
    async fn on_success(&mut self, _message: &str) {}

    /// Terminal: the job failed server-side. The session closes after this
    /// call. This is an application-level outcome, not a transport error.
    async fn on_error(&mut self, _message: &str) {}

    /// One record's payload failed to decode. The session continues; a
    /// malformed record never loses the records behind it.
    async fn on_parse_error(&mut self, _line: &str, _error: &serde_json::Error) {}

    /// The stream ended without a terminal event.
    async fn on_stream_end(&mut self) {}

    /// The session failed after becoming active (timeout or read error)
    /// and is now closed. Surfaced exactly once.
    async fn on_stream_error(&mut self, _error: &ClientError) {}
}
