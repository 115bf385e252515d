//! Core library for tailtrade
//!
//! Client for the Tail Trading stock-selection service: a streaming log
//! ingestor for the server's SSE job-progress channel, and a typed API
//! client for the non-streaming endpoints (auth, selection, scheduler).

pub mod api;
pub mod error;
pub mod stream;

pub use api::ApiClient;
pub use error::ClientError;
pub use stream::{EventSink, SessionSlot, StreamEvent, StreamOutcome, StreamSession};
