//! Streaming line codec
//!
//! Serial reads arrive in arbitrary chunks; this codec buffers bytes and
//! yields complete `\n`-terminated lines. Carriage returns are stripped so
//! firmware emitting `\r\n` behaves identically.

use tracing::warn;

/// Maximum line length before the buffer is discarded.
///
/// Scan responses grow with the number of boards, but anything past this is
/// a desynchronized stream, not a real response.
pub const MAX_LINE_LEN: usize = 512;

/// Streaming extractor for newline-terminated ASCII lines
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create a new codec with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > MAX_LINE_LEN && !self.buffer.contains(&b'\n') {
            warn!(
                len = self.buffer.len(),
                "discarding oversized partial line"
            );
            self.buffer.clear();
        }
    }

    /// Try to extract the next complete line from the buffer
    ///
    /// Returns the line without its terminator. Empty lines are skipped.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=pos).take(pos).collect();
            let text = String::from_utf8_lossy(&line).trim_end_matches('\r').to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"0\n");
        assert_eq!(codec.next_line().as_deref(), Some("0"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn split_across_chunks() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"32 3");
        assert_eq!(codec.next_line(), None);
        codec.push_bytes(b"3 34\n");
        assert_eq!(codec.next_line().as_deref(), Some("32 33 34"));
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"0\n1\n");
        assert_eq!(codec.next_line().as_deref(), Some("0"));
        assert_eq!(codec.next_line().as_deref(), Some("1"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn strips_carriage_return_and_blank_lines() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"\r\nOK\r\n\n");
        assert_eq!(codec.next_line().as_deref(), Some("OK"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn oversized_partial_line_is_discarded() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&vec![b'x'; MAX_LINE_LEN + 1]);
        codec.push_bytes(b"0\n");
        assert_eq!(codec.next_line().as_deref(), Some("0"));
    }

    proptest! {
        /// Chunking must never change the sequence of extracted lines
        #[test]
        fn chunking_invariance(
            lines in proptest::collection::vec("[ -~]{1,20}", 1..8),
            split in 1usize..16,
        ) {
            let joined: Vec<u8> = lines
                .iter()
                .flat_map(|l| {
                    let mut v = l.trim().as_bytes().to_vec();
                    v.push(b'\n');
                    v
                })
                .collect();

            let mut whole = LineCodec::new();
            whole.push_bytes(&joined);
            let mut expected = Vec::new();
            while let Some(l) = whole.next_line() {
                expected.push(l);
            }

            let mut chunked = LineCodec::new();
            let mut got = Vec::new();
            for chunk in joined.chunks(split) {
                chunked.push_bytes(chunk);
                while let Some(l) = chunked.next_line() {
                    got.push(l);
                }
            }

            prop_assert_eq!(got, expected);
        }
    }
}
