use std::fmt::{self, Write};

/// Longest prefix of `value` that fits in `max_bytes` without splitting a character.
pub fn truncate_to_boundary(value: &str, max_bytes: usize) -> &str {
    let mut end = value.len().min(max_bytes);
    while !value.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    &value[..end]
}

/// Copies `src` only when the whole value fits in `cap` bytes.
pub fn bounded_copy(src: &str, cap: usize) -> Option<String> {
    if src.len() > cap {
        return None;
    }
    Some(src.to_owned())
}

/// Formats into a fresh string, failing instead of truncating when the
/// output would exceed `cap` bytes.
pub fn bounded_format(cap: usize, args: fmt::Arguments<'_>) -> Option<String> {
    let mut out = BoundedString {
        buf: String::new(),
        cap,
    };
    out.write_fmt(args).ok()?;
    Some(out.buf)
}

struct BoundedString {
    buf: String,
    cap: usize,
}

impl Write for BoundedString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.cap {
            return Err(fmt::Error);
        }
        self.buf.push_str(s);
        Ok(())
    }
}

pub fn in_bounds(x: i32, y: i32, width: i32, height: i32) -> bool {
    x >= 0 && y >= 0 && x < width && y < height
}

/// True when the rectangle at (x, y) with the given size lies fully inside
/// a `width` x `height` area.
pub fn rect_in_bounds(x: i32, y: i32, rect_width: i32, rect_height: i32, width: i32, height: i32) -> bool {
    if rect_width <= 0 || rect_height <= 0 {
        return false;
    }
    let right = x as i64 + rect_width as i64;
    let bottom = y as i64 + rect_height as i64;
    x >= 0 && y >= 0 && right <= width as i64 && bottom <= height as i64
}
