//! Stream session lifecycle
//!
//! One session binds one HTTP response stream to one timeout and one
//! handler set. Processing is strictly sequential: a chunk is fully
//! dispatched before the next is requested. The timeout timer and the read
//! loop race; whichever reaches a terminal state first wins and the
//! loser's actions are suppressed.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{parse_record, StreamEvent};
use super::line_buffer::LineBuffer;
use super::sink::EventSink;
use crate::error::{status_error, ClientError};

/// How a closed session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminal `success` event dispatched.
    Success,
    /// Terminal `error` event dispatched (application-level, not a
    /// transport failure).
    Failed,
    /// The stream ended without a terminal event.
    EndOfStream,
    /// Closed by the caller.
    Canceled,
}

/// Whether the session stays active after a processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Closed(StreamOutcome),
}

/// Sequential chunk-to-event processor.
///
/// Splits incoming bytes into newline-delimited records, parses framed
/// records, and dispatches each event to the sink in arrival order. A
/// malformed record is reported and skipped; it never loses the records
/// behind it. Once a terminal event has been dispatched the ingestor is
/// closed and later chunks are ignored.
pub struct Ingestor<S: EventSink> {
    buffer: LineBuffer,
    sink: S,
    started: std::time::Instant,
    records: usize,
    bytes_received: usize,
    closed: Option<StreamOutcome>,
}

impl<S: EventSink> Ingestor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            buffer: LineBuffer::new(),
            sink,
            started: std::time::Instant::now(),
            records: 0,
            bytes_received: 0,
            closed: None,
        }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Process one chunk: drain every record it completes and dispatch
    /// them in order. Stops at the first terminal event; records after it
    /// in the same chunk are not dispatched.
    pub async fn process_chunk(&mut self, chunk: Bytes) -> Control {
        if let Some(outcome) = self.closed {
            return Control::Closed(outcome);
        }

        self.bytes_received += chunk.len();
        debug!(
            "stream chunk: {} bytes (total {})",
            chunk.len(),
            self.bytes_received
        );

        for line in self.buffer.push(&chunk) {
            if let Control::Closed(outcome) = self.dispatch(&line).await {
                self.closed = Some(outcome);
                return Control::Closed(outcome);
            }
        }
        Control::Continue
    }

    async fn dispatch(&mut self, line: &str) -> Control {
        let Some(parsed) = parse_record(line) else {
            // Blank keep-alive lines and other unframed records.
            return Control::Continue;
        };

        let event = match parsed {
            Ok(event) => event,
            Err(e) => {
                warn!("unparseable stream record: {e}");
                self.sink.on_parse_error(line, &e).await;
                return Control::Continue;
            }
        };

        self.records += 1;
        debug!("stream record #{} at {:?}", self.records, self.started.elapsed());

        match event {
            StreamEvent::Start { message } => {
                self.sink.on_start(&message).await;
                Control::Continue
            }
            StreamEvent::Log { message } => {
                self.sink.on_log(&message).await;
                Control::Continue
            }
            StreamEvent::Success { message } => {
                info!(
                    "stream finished after {:?}, {} records, {} bytes",
                    self.started.elapsed(),
                    self.records,
                    self.bytes_received
                );
                self.sink.on_success(&message).await;
                Control::Closed(StreamOutcome::Success)
            }
            StreamEvent::Error { message } => {
                warn!("stream reported failure: {message}");
                self.sink.on_error(&message).await;
                Control::Closed(StreamOutcome::Failed)
            }
        }
    }

    /// End-of-stream with no terminal event seen.
    pub async fn finish(&mut self) {
        if !self.buffer.partial().is_empty() {
            debug!(
                "discarding {} unterminated bytes at end of stream",
                self.buffer.partial().len()
            );
        }
        info!(
            "stream ended: {} records, {} bytes in {:?}",
            self.records,
            self.bytes_received,
            self.started.elapsed()
        );
        self.sink.on_stream_end().await;
    }
}

/// Handle to an active stream session.
///
/// Closing is cooperative and idempotent: it stops future chunk delivery
/// but never un-dispatches events already handed to the sink.
#[derive(Debug)]
pub struct StreamSession {
    cancel: CancellationToken,
    handle: JoinHandle<Result<StreamOutcome, ClientError>>,
}

impl StreamSession {
    /// Explicit cancellation. Closing an already-closed session is a no-op.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Await the session outcome.
    pub async fn wait(self) -> Result<StreamOutcome, ClientError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::StreamRead(format!("stream task failed: {e}"))),
        }
    }
}

/// Owns the single live session for one logical operation.
///
/// The original client tracked this with a hidden module-level handle; an
/// explicit slot owned by the caller replaces it. Installing a replacement
/// closes the previous session first, so two streams for the same
/// operation never run at once.
#[derive(Default)]
pub struct SessionSlot {
    current: Option<StreamSession>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Close any prior session and install the new one.
    pub fn replace(&mut self, session: StreamSession) {
        self.close();
        self.current = Some(session);
    }

    /// Cancel the live session, if any. Idempotent.
    pub fn close(&mut self) {
        if let Some(prev) = self.current.take() {
            prev.close();
        }
    }

    /// Hand the live session to the caller, e.g. to await its outcome.
    pub fn take(&mut self) -> Option<StreamSession> {
        self.current.take()
    }

    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.is_finished())
    }
}

/// Issue the stream request and start asynchronous line processing.
///
/// A non-success HTTP status fails here with the matching error kind and
/// no events are dispatched; the session never becomes active. Otherwise
/// the returned session is active and a timeout of `timeout` is armed: if
/// no terminal event and no end-of-stream arrives before it fires, the
/// session closes with [`ClientError::Timeout`] and the underlying stream
/// is canceled.
pub async fn open<S>(
    request: reqwest::RequestBuilder,
    timeout: Duration,
    sink: S,
) -> Result<StreamSession, ClientError>
where
    S: EventSink + 'static,
{
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(drive(response, timeout, sink, cancel.clone()));
    Ok(StreamSession { cancel, handle })
}

async fn drive<S: EventSink>(
    response: reqwest::Response,
    timeout: Duration,
    sink: S,
    cancel: CancellationToken,
) -> Result<StreamOutcome, ClientError> {
    let deadline = Instant::now() + timeout;
    let mut stream = response.bytes_stream();
    let mut ingestor = Ingestor::new(sink);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamOutcome::Canceled),
            _ = tokio::time::sleep_until(deadline) => {
                let err = ClientError::Timeout(timeout);
                ingestor.sink_mut().on_stream_error(&err).await;
                return Err(err);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if let Control::Closed(outcome) = ingestor.process_chunk(chunk).await {
                    // Dropping the stream cancels the underlying read.
                    return Ok(outcome);
                }
            }
            Some(Err(e)) => {
                let err = ClientError::StreamRead(e.to_string());
                ingestor.sink_mut().on_stream_error(&err).await;
                return Err(err);
            }
            None => {
                ingestor.finish().await;
                return Ok(StreamOutcome::EndOfStream);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// Sink that records every handler call in order.
    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }
    }

    #[async_trait::async_trait]
    impl EventSink for RecordingSink {
        async fn on_start(&mut self, message: &str) {
            self.record(format!("start:{message}"));
        }
        async fn on_log(&mut self, message: &str) {
            self.record(format!("log:{message}"));
        }
        async fn on_success(&mut self, message: &str) {
            self.record(format!("success:{message}"));
        }
        async fn on_error(&mut self, message: &str) {
            self.record(format!("error:{message}"));
        }
        async fn on_parse_error(&mut self, line: &str, _error: &serde_json::Error) {
            self.record(format!("parse-error:{line}"));
        }
        async fn on_stream_end(&mut self) {
            self.record("end".to_string());
        }
        async fn on_stream_error(&mut self, error: &ClientError) {
            self.record(format!("stream-error:{error}"));
        }
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let sink = RecordingSink::default();
        let mut ingestor = Ingestor::new(sink.clone());

        let control = ingestor
            .process_chunk(Bytes::from_static(b"data:{\"typ"))
            .await;
        assert_eq!(control, Control::Continue);
        assert!(sink.calls().is_empty());

        let control = ingestor
            .process_chunk(Bytes::from_static(b"e\":\"start\",\"message\":\"go\"}\n"))
            .await;
        assert_eq!(control, Control::Continue);
        assert_eq!(sink.calls(), vec!["start:go"]);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_lose_later_records() {
        let sink = RecordingSink::default();
        let mut ingestor = Ingestor::new(sink.clone());

        let input = "data:{\"type\":\"log\",\"message\":\"x\"}\n\
                     data:garbage\n\
                     data:{\"type\":\"success\",\"message\":\"done\"}\n";
        let control = ingestor.process_chunk(Bytes::from(input)).await;

        assert_eq!(control, Control::Closed(StreamOutcome::Success));
        assert_eq!(
            sink.calls(),
            vec!["log:x", "parse-error:data:garbage", "success:done"]
        );
    }

    #[tokio::test]
    async fn test_no_dispatch_after_terminal_event() {
        let sink = RecordingSink::default();
        let mut ingestor = Ingestor::new(sink.clone());

        let input = "data:{\"type\":\"error\",\"message\":\"boom\"}\n\
                     data:{\"type\":\"log\",\"message\":\"late\"}\n";
        let control = ingestor.process_chunk(Bytes::from(input)).await;
        assert_eq!(control, Control::Closed(StreamOutcome::Failed));

        // A later chunk is ignored entirely.
        let control = ingestor
            .process_chunk(Bytes::from_static(
                b"data:{\"type\":\"log\",\"message\":\"more\"}\n",
            ))
            .await;
        assert_eq!(control, Control::Closed(StreamOutcome::Failed));
        assert_eq!(sink.calls(), vec!["error:boom"]);
    }

    #[tokio::test]
    async fn test_unframed_records_never_dispatch() {
        let sink = RecordingSink::default();
        let mut ingestor = Ingestor::new(sink.clone());

        let input = "\n: keep-alive\nevent: log\n{\"type\":\"log\",\"message\":\"x\"}\n";
        let control = ingestor.process_chunk(Bytes::from(input)).await;

        assert_eq!(control, Control::Continue);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_end_of_stream_invokes_handler_once() {
        let sink = RecordingSink::default();
        let mut ingestor = Ingestor::new(sink.clone());

        ingestor
            .process_chunk(Bytes::from_static(
                b"data:{\"type\":\"log\",\"message\":\"x\"}\ndata:{\"trunc",
            ))
            .await;
        ingestor.finish().await;

        assert_eq!(sink.calls(), vec!["log:x", "end"]);
    }

    // -- network-level tests against a canned TCP server --

    async fn spawn_server(response: String, hold_open: bool) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                // Drain the request head before answering.
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
                if hold_open {
                    std::future::pending::<()>().await;
                }
            }
        });
        addr
    }

    fn sse_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
        )
    }

    #[tokio::test]
    async fn test_open_fails_on_unauthorized_without_dispatch() {
        let body = r#"{"detail":"Invalid authentication credentials"}"#;
        let response = format!(
            "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let addr = spawn_server(response, false).await;

        let sink = RecordingSink::default();
        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let result = open(request, Duration::from_secs(300), sink.clone()).await;

        match result {
            Err(ClientError::AuthExpired(detail)) => {
                assert_eq!(detail, "Invalid authentication credentials");
            }
            other => panic!("expected AuthExpired, got {other:?}"),
        }
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_fails_on_server_error() {
        let response =
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                .to_string();
        let addr = spawn_server(response, false).await;

        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let result = open(request, Duration::from_secs(300), RecordingSink::default()).await;

        match result {
            Err(ClientError::Status { status, .. }) => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_closes_on_terminal_success() {
        let body = "data:{\"type\":\"start\",\"message\":\"begin\"}\n\n\
                    data:{\"type\":\"log\",\"message\":\"step\"}\n\n\
                    data:{\"type\":\"success\",\"message\":\"done\"}\n\n";
        let addr = spawn_server(sse_response(body), true).await;

        let sink = RecordingSink::default();
        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let session = open(request, Duration::from_secs(300), sink.clone())
            .await
            .unwrap();

        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome, StreamOutcome::Success);
        assert_eq!(sink.calls(), vec!["start:begin", "log:step", "success:done"]);
    }

    #[tokio::test]
    async fn test_end_of_stream_without_terminal_event() {
        let body = "data:{\"type\":\"log\",\"message\":\"only\"}\n\n";
        let addr = spawn_server(sse_response(body), false).await;

        let sink = RecordingSink::default();
        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let session = open(request, Duration::from_secs(300), sink.clone())
            .await
            .unwrap();

        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome, StreamOutcome::EndOfStream);
        assert_eq!(sink.calls(), vec!["log:only", "end"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_at_deadline_when_no_bytes_arrive() {
        // Headers only; the body never comes.
        let addr = spawn_server(sse_response(""), true).await;

        let sink = RecordingSink::default();
        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let timeout = Duration::from_millis(300_000);

        let opened_at = Instant::now();
        let session = open(request, timeout, sink.clone()).await.unwrap();
        let result = session.wait().await;

        match result {
            Err(ClientError::Timeout(d)) => assert_eq!(d, timeout),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(opened_at.elapsed() >= timeout);
        assert_eq!(sink.calls().len(), 1);
        assert!(sink.calls()[0].starts_with("stream-error:"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let addr = spawn_server(sse_response(""), true).await;

        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let session = open(request, Duration::from_secs(300), RecordingSink::default())
            .await
            .unwrap();

        session.close();
        session.close();
        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome, StreamOutcome::Canceled);
    }

    #[tokio::test]
    async fn test_session_slot_closes_on_replace() {
        let addr = spawn_server(sse_response(""), true).await;
        let request = reqwest::Client::new().get(format!("http://{addr}/"));
        let first = open(request, Duration::from_secs(300), RecordingSink::default())
            .await
            .unwrap();

        let mut slot = SessionSlot::new();
        slot.replace(first);
        assert!(slot.is_active());

        slot.close();
        slot.close();
        assert!(!slot.is_active());
        assert!(slot.take().is_none());
    }
}
