//! Partial-line buffering for chunked stream bodies

/// Accumulates raw bytes and drains newline-terminated records.
///
/// Buffering happens at the byte level: a record is only decoded to text
/// once its terminating `\n` has arrived, so a multi-byte UTF-8 sequence
/// split across two chunks is reassembled before decoding instead of being
/// emitted as replacement characters.
///
/// After each [`push`](Self::push) the buffer holds at most one partial
/// (unterminated) record; every completed record has been returned.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append a chunk and return every record completed by it, in order.
    ///
    /// Blank records (consecutive newlines) are returned as empty strings;
    /// the caller decides what unframed records mean.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let Some(last) = self.buf.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.buf.split_off(last + 1);
        let complete = std::mem::replace(&mut self.buf, tail);

        let mut records: Vec<String> = complete
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        // The final split segment is the artifact of the trailing newline,
        // not a record.
        records.pop();
        records
    }

    /// Bytes of the current unterminated record, if any.
    pub fn partial(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_drained_in_order() {
        let mut buf = LineBuffer::new();
        let records = buf.push(b"one\ntwo\nthree\n");
        assert_eq!(records, vec!["one", "two", "three"]);
        assert!(buf.partial().is_empty());
    }

    #[test]
    fn test_partial_line_retained_across_chunks() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"hel"), Vec::<String>::new());
        assert_eq!(buf.push(b"lo\nwor"), vec!["hello"]);
        assert_eq!(buf.partial(), b"wor");
        assert_eq!(buf.push(b"ld\n"), vec!["world"]);
        assert!(buf.partial().is_empty());
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        // "数据更新" is 12 bytes of UTF-8; split in the middle of the
        // second character.
        let text = "数据更新\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(&text[..4]), Vec::<String>::new());
        let records = buf.push(&text[4..]);
        assert_eq!(records, vec!["数据更新"]);
        assert!(!records[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_any_chunk_split_matches_single_chunk() {
        let input = "data:{\"type\":\"log\",\"message\":\"更新进度 50%\"}\n\ndata:ok\n".as_bytes();

        let mut whole = LineBuffer::new();
        let expected = whole.push(input);

        for split in 0..=input.len() {
            let mut buf = LineBuffer::new();
            let mut records = buf.push(&input[..split]);
            records.extend(buf.push(&input[split..]));
            assert_eq!(records, expected, "split at byte {}", split);
            assert_eq!(buf.partial(), whole.partial());
        }
    }

    #[test]
    fn test_blank_records_preserved() {
        let mut buf = LineBuffer::new();
        // SSE keep-alive framing: records separated by blank lines.
        let records = buf.push(b"data:a\n\ndata:b\n");
        assert_eq!(records, vec!["data:a", "", "data:b"]);
    }
}
