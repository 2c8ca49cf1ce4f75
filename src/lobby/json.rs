//! Tolerant field extraction for lobby lines. The server's replies are small
//! flat objects, so the client only needs to pull out a named string or a
//! nested object without validating the rest of the document.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Unescaped string contents.
    Text(String),
    /// Raw object text, braces included.
    Object(String),
}

impl FieldValue {
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(text) | FieldValue::Object(text) => text,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            FieldValue::Text(text) | FieldValue::Object(text) => text,
        }
    }
}

/// Finds `"key"` followed by `:` and reads the value after it. Occurrences of
/// the quoted key that are not followed by a colon (for example as a value)
/// are skipped. Numbers, booleans and arrays yield `None`.
pub fn extract_field(text: &str, key: &str) -> Option<FieldValue> {
    let needle = format!("\"{key}\"");
    let bytes = text.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(&needle) {
        let after_key = search_from + offset + needle.len();
        let mut pos = skip_whitespace(bytes, after_key);
        if bytes.get(pos) == Some(&b':') {
            pos = skip_whitespace(bytes, pos + 1);
            return match bytes.get(pos) {
                Some(b'"') => read_string(text, pos + 1).map(FieldValue::Text),
                Some(b'{') => read_object(text, pos).map(FieldValue::Object),
                _ => None,
            };
        }
        search_from = after_key;
    }
    None
}

pub fn extract_string(text: &str, key: &str) -> Option<String> {
    match extract_field(text, key)? {
        FieldValue::Text(value) => Some(value),
        FieldValue::Object(_) => None,
    }
}

/// The `cmd` of a lobby line, when present.
pub fn command(text: &str) -> Option<String> {
    extract_string(text, "cmd")
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn read_string(text: &str, start: usize) -> Option<String> {
    let mut out = String::new();
    let mut chars = text[start..].chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return Some(out),
            '\\' => match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                '/' => out.push('/'),
                'b' => out.push('\u{0008}'),
                'f' => out.push('\u{000C}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'u' => {
                    let unit = read_hex4(&mut chars)?;
                    out.push(decode_escaped_unit(unit, &mut chars));
                }
                other => out.push(other),
            },
            other => out.push(other),
        }
    }
    None
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Option<u16> {
    let mut value = 0u16;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        value = (value << 4) | digit as u16;
    }
    Some(value)
}

fn decode_escaped_unit(unit: u16, chars: &mut std::str::Chars<'_>) -> char {
    const REPLACEMENT: char = '\u{FFFD}';
    if (0xD800..=0xDBFF).contains(&unit) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            if let Some(low) = read_hex4(&mut lookahead) {
                if (0xDC00..=0xDFFF).contains(&low) {
                    *chars = lookahead;
                    let code = 0x10000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
                    return char::from_u32(code).unwrap_or(REPLACEMENT);
                }
            }
        }
        return REPLACEMENT;
    }
    char::from_u32(unit as u32).unwrap_or(REPLACEMENT)
}

fn read_object(text: &str, start: usize) -> Option<String> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(text[start..=index].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
