pub const REPLACEMENT: char = '\u{FFFD}';

pub fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

pub fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

pub fn combine_pair(high: u16, low: u16) -> char {
    let scalar = 0x10000 + (((high as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
    char::from_u32(scalar).unwrap_or(REPLACEMENT)
}

/// Glyph for a cell that is not half of a complete pair. Empty cells show
/// as a space and stray surrogates as U+FFFD.
pub fn unit_char(unit: u16) -> char {
    if unit == 0 {
        return ' ';
    }
    char::from_u32(unit as u32).unwrap_or(REPLACEMENT)
}
