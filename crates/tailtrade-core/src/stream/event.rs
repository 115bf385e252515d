//! Wire events for the job-progress stream
//!
//! Each payload-bearing record is a single line `data:{json}` where the
//! JSON object carries a `type` tag and a human-readable `message`.

use serde::{Deserialize, Serialize};

/// Framing marker identifying a payload-bearing record.
pub const DATA_PREFIX: &str = "data:";

/// One event decoded from a stream record.
///
/// The server attaches extra fields (`timestamp`, `line`) which are
/// tolerated and ignored here. An unknown `type` fails decoding and is
/// treated as a recoverable parse error by the ingestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// The job has started producing output.
    Start { message: String },
    /// One progress line.
    Log { message: String },
    /// Terminal: the job completed.
    Success { message: String },
    /// Terminal: the job failed server-side.
    Error { message: String },
}

impl StreamEvent {
    /// Terminal events end the stream; the consumer closes the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Success { .. } | StreamEvent::Error { .. })
    }
}

/// Examine one complete record line.
///
/// Returns `None` for records without the `data:` prefix (blank keep-alive
/// lines and any other framing noise), which are ignored per the SSE
/// convention. For framed records, exactly the 5-character marker is
/// stripped and the remainder parsed as JSON; the server emits an optional
/// space after the colon, which the JSON parser absorbs as leading
/// whitespace.
pub fn parse_record(line: &str) -> Option<Result<StreamEvent, serde_json::Error>> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(serde_json::from_str(payload))
}
