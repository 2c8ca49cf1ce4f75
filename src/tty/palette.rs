use super::writer::BoundedWriter;

pub const BLACK: u8 = 0;
pub const RED: u8 = 1;
pub const GREEN: u8 = 2;
pub const YELLOW: u8 = 3;
pub const BLUE: u8 = 4;
pub const MAGENTA: u8 = 5;
pub const CYAN: u8 = 6;
pub const WHITE: u8 = 7;
pub const BRIGHT_BLACK: u8 = 8;
pub const BRIGHT_RED: u8 = 9;
pub const BRIGHT_GREEN: u8 = 10;
pub const BRIGHT_YELLOW: u8 = 11;
pub const BRIGHT_BLUE: u8 = 12;
pub const BRIGHT_MAGENTA: u8 = 13;
pub const BRIGHT_CYAN: u8 = 14;
pub const BRIGHT_WHITE: u8 = 15;

const FOREGROUND: [&str; 16] = [
    "\x1b[30m", "\x1b[31m", "\x1b[32m", "\x1b[33m", "\x1b[34m", "\x1b[35m", "\x1b[36m", "\x1b[37m",
    "\x1b[90m", "\x1b[91m", "\x1b[92m", "\x1b[93m", "\x1b[94m", "\x1b[95m", "\x1b[96m", "\x1b[97m",
];

const BACKGROUND: [&str; 16] = [
    "\x1b[40m", "\x1b[41m", "\x1b[42m", "\x1b[43m", "\x1b[44m", "\x1b[45m", "\x1b[46m", "\x1b[47m",
    "\x1b[100m", "\x1b[101m", "\x1b[102m", "\x1b[103m", "\x1b[104m", "\x1b[105m", "\x1b[106m",
    "\x1b[107m",
];

// xterm defaults for the 16 ANSI colors.
const RGB: [(i32, i32, i32); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// Packs a foreground/background pair into a cell color.
pub const fn pack(fg: u8, bg: u8) -> u16 {
    (((bg & 0x0F) as u16) << 4) | (fg & 0x0F) as u16
}

pub const fn fg(color: u16) -> u8 {
    (color & 0x0F) as u8
}

pub const fn bg(color: u16) -> u8 {
    ((color >> 4) & 0x0F) as u8
}

pub fn foreground_sequence(index: u8) -> &'static str {
    FOREGROUND[(index & 0x0F) as usize]
}

pub fn background_sequence(index: u8) -> &'static str {
    BACKGROUND[(index & 0x0F) as usize]
}

/// Appends the fg+bg sequences for `color`; false if the writer is full.
pub fn push_sequence(writer: &mut BoundedWriter, color: u16) -> bool {
    let fg = foreground_sequence(fg(color)).as_bytes();
    let bg = background_sequence(bg(color)).as_bytes();
    let mark = writer.len();
    if writer.push(fg) && writer.push(bg) {
        return true;
    }
    writer.truncate(mark);
    false
}

/// Closest ANSI palette index for a 0xAARRGGBB color.
pub fn nearest_ansi(argb: u32) -> u8 {
    let r = ((argb >> 16) & 0xFF) as i32;
    let g = ((argb >> 8) & 0xFF) as i32;
    let b = (argb & 0xFF) as i32;
    let mut best = 0usize;
    let mut best_distance = i32::MAX;
    for (index, (pr, pg, pb)) in RGB.iter().enumerate() {
        let distance = (r - pr).pow(2) + (g - pg).pow(2) + (b - pb).pow(2);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best as u8
}
