//! Streaming log ingestion
//!
//! Consumes the server's SSE job-progress channel: newline-delimited
//! records, each payload-bearing line prefixed with `data:` and carrying a
//! tagged JSON event. Handles partial lines across chunk boundaries and
//! drives session timeout/cancellation state.

mod event;
mod line_buffer;
mod session;
mod sink;

pub use event::{parse_record, StreamEvent, DATA_PREFIX};
pub use line_buffer::LineBuffer;
pub use session::{open, Control, Ingestor, SessionSlot, StreamOutcome, StreamSession};
pub use sink::EventSink;
