use std::collections::TryReserveError;
use std::fmt;

/// Append-only byte buffer that refuses writes past a fixed capacity
/// instead of growing. A refused push leaves the buffer untouched.
#[derive(Debug)]
pub struct BoundedWriter {
    buf: Vec<u8>,
    cap: usize,
}

impl BoundedWriter {
    pub fn new(cap: usize) -> Result<Self, TryReserveError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(cap)?;
        Ok(Self { buf, cap })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn push(&mut self, bytes: &[u8]) -> bool {
        match self.buf.len().checked_add(bytes.len()) {
            Some(end) if end <= self.cap => {
                self.buf.extend_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    /// Changes the capacity. Shrinking drops any pending bytes.
    pub fn resize_cap(&mut self, cap: usize) -> Result<(), TryReserveError> {
        if cap > self.buf.capacity() {
            let additional = cap - self.buf.len();
            self.buf.try_reserve_exact(additional)?;
        }
        if cap < self.buf.len() {
            self.buf.clear();
        }
        self.cap = cap;
        Ok(())
    }
}

impl fmt::Write for BoundedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.push(s.as_bytes()) {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn refuses_past_cap_without_partial_write() {
        let mut writer = BoundedWriter::new(8).expect("alloc");
        assert!(writer.push(b"abcde"));
        assert!(!writer.push(b"fghij"));
        assert_eq!(writer.as_bytes(), b"abcde");
        assert!(write!(writer, "{}", 123).is_ok());
        assert!(write!(writer, "{}", 4).is_err());
        assert_eq!(writer.len(), 8);
    }

    #[test]
    fn truncate_and_resize() {
        let mut writer = BoundedWriter::new(4).expect("alloc");
        assert!(writer.push(b"abcd"));
        writer.truncate(1);
        assert_eq!(writer.as_bytes(), b"a");
        writer.resize_cap(16).expect("grow");
        assert!(writer.push(b"0123456789"));
        writer.resize_cap(2).expect("shrink");
        assert!(writer.is_empty());
        assert_eq!(writer.cap(), 2);
    }
}
