//! Incremental newline splitter.

/// Splits a byte stream into lines as chunks arrive.
///
/// Bytes after the last `\n` are held back and prefixed onto the next chunk,
/// so a line is only ever yielded once its terminator has been seen. Splitting
/// happens on raw bytes, which keeps multi-byte UTF-8 sequences that straddle
/// chunk boundaries intact. `pending` never holds a `\n`, so each chunk is
/// only scanned once.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let Some(offset) = chunk.iter().rposition(|b| *b == b'\n') else {
            self.pending.extend_from_slice(chunk);
            return Vec::new();
        };
        let last_newline = self.pending.len() + offset;
        self.pending.extend_from_slice(chunk);

        let remainder = self.pending.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.pending, remainder);
        complete.pop();

        complete
            .split(|b| *b == b'\n')
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Bytes received after the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Take the unterminated remainder, leaving the splitter empty.
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}
