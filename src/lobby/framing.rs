pub const LINE_BUFFER_CAP: usize = 4096;

/// Accumulates socket bytes into newline-terminated lines. A line that grows
/// past the cap without a newline is discarded.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    cap: usize,
    overflows: u64,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_cap(LINE_BUFFER_CAP)
    }
}

impl LineBuffer {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap.min(LINE_BUFFER_CAP)),
            cap: cap.max(1),
            overflows: 0,
        }
    }

    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Feeds `bytes` and returns every complete, non-empty line. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                if !self.buf.is_empty() {
                    let line = String::from_utf8_lossy(&self.buf);
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                self.buf.clear();
            } else if self.buf.len() + 1 < self.cap {
                self.buf.push(byte);
            } else {
                self.overflows += 1;
                self.buf.clear();
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_reads() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.feed(b"{\"cmd\":").is_empty());
        let lines = buffer.feed(b"\"host\"}\n\n{\"a\":1}\r\n{\"b\"");
        assert_eq!(lines, vec!["{\"cmd\":\"host\"}", "{\"a\":1}"]);
        assert_eq!(buffer.feed(b":2}\n"), vec!["{\"b\":2}"]);
    }

    #[test]
    fn overflow_resets_partial_line() {
        let mut buffer = LineBuffer::with_cap(8);
        let lines = buffer.feed(b"0123456789ab\nok\n");
        assert_eq!(buffer.overflows(), 1);
        assert_eq!(lines, vec!["89ab", "ok"]);
    }
}
