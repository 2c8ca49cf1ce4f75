//! Double-buffered terminal output.
//!
//! Drawing goes to the back buffer; `flush` compares it with the front
//! buffer (what the terminal currently shows) and emits only the changed
//! spans as ANSI sequences.

pub mod palette;
pub mod terminal;
pub mod utf;
pub mod writer;

use self::terminal::RawModeGuard;
use self::utf::{combine_pair, is_high_surrogate, is_low_surrogate, unit_char};
use self::writer::BoundedWriter;
use crate::shared::validate::in_bounds;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Upper bound for the per-frame escape buffer.
pub const WRITE_BUFFER_CAP: usize = 10 * 1024 * 1024;
pub const BYTES_PER_CELL: usize = 32;
pub const MAX_CELLS: usize = 4096 * 2160;

const SETUP: &str = "\x1b[2J\x1b[?25l";
const TEARDOWN: &str = "\x1b[0m\x1b[?25h\x1b[2J\x1b[H";

#[derive(Debug, Error)]
pub enum TtyError {
    #[error("terminal i/o: {0}")]
    Io(#[from] io::Error),
    #[error("{width}x{height} terminal is too large to buffer")]
    TooLarge { width: u16, height: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub code_unit: u16,
    pub color: u16,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        code_unit: b' ' as u16,
        color: palette::pack(palette::WHITE, palette::BLACK),
    };

    /// Never produced by drawing, so a front buffer filled with it forces
    /// every cell to be re-emitted.
    const STALE: Cell = Cell {
        code_unit: 0xFFFF,
        color: 0xFFFF,
    };

    pub const fn new(code_unit: u16, color: u16) -> Self {
        Self { code_unit, color }
    }

    pub fn from_char(ch: char, color: u16) -> Self {
        let mut units = [0u16; 2];
        let code_unit = ch.encode_utf16(&mut units)[0];
        Self { code_unit, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn cells(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn covers(self, min: Size) -> bool {
        self.width >= min.width && self.height >= min.height
    }
}

pub type SizeCallback = Box<dyn FnMut(Size) + Send>;

fn alloc_cells(size: Size, fill: Cell) -> Result<Vec<Cell>, TtyError> {
    let too_large = || TtyError::TooLarge {
        width: size.width,
        height: size.height,
    };
    let count = size.cells();
    if count > MAX_CELLS {
        return Err(too_large());
    }
    let mut cells = Vec::new();
    cells.try_reserve_exact(count).map_err(|_| too_large())?;
    cells.resize(count, fill);
    Ok(cells)
}

fn write_buffer_len(size: Size) -> usize {
    size.cells().saturating_mul(BYTES_PER_CELL).min(WRITE_BUFFER_CAP)
}

pub struct Tty<W: Write> {
    out: W,
    size: Size,
    min: Size,
    front: Vec<Cell>,
    back: Vec<Cell>,
    dirty: bool,
    size_valid: bool,
    writer: BoundedWriter,
    resize_pending: Arc<AtomicBool>,
    test_size: Option<Size>,
    on_resize: Option<SizeCallback>,
    on_size_invalid: Option<SizeCallback>,
    // Dropped after `Drop::drop` has written the teardown sequence.
    _raw_mode: Option<RawModeGuard>,
}

impl Tty<Box<dyn Write + Send>> {
    /// Opens the controlling terminal (or `path`) in raw mode.
    pub fn open(path: Option<&Path>, min: Size) -> Result<Self, TtyError> {
        let out: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(OpenOptions::new().write(true).open(path)?),
            None => Box::new(io::stdout()),
        };
        let guard = RawModeGuard::acquire()?;
        let (width, height) = terminal::terminal_size()?;
        let tty = Self::build(out, Size::new(width, height), min, None, Some(guard))?;
        tracing::info!(width, height, "terminal opened");
        Ok(tty)
    }
}

impl<W: Write> Tty<W> {
    /// Terminal over an arbitrary writer with a fixed reported size.
    pub fn with_writer(out: W, size: Size, min: Size) -> Result<Self, TtyError> {
        Self::build(out, size, min, Some(size), None)
    }

    fn build(
        mut out: W,
        size: Size,
        min: Size,
        test_size: Option<Size>,
        raw_mode: Option<RawModeGuard>,
    ) -> Result<Self, TtyError> {
        let front = alloc_cells(size, Cell::BLANK)?;
        let back = alloc_cells(size, Cell::BLANK)?;
        let writer = BoundedWriter::new(write_buffer_len(size)).map_err(|_| TtyError::TooLarge {
            width: size.width,
            height: size.height,
        })?;
        out.write_all(SETUP.as_bytes())?;
        out.flush()?;
        Ok(Self {
            out,
            size,
            min,
            front,
            back,
            dirty: false,
            size_valid: size.covers(min),
            writer,
            resize_pending: Arc::new(AtomicBool::new(false)),
            test_size,
            on_resize: None,
            on_size_invalid: None,
            _raw_mode: raw_mode,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn min_size(&self) -> Size {
        self.min
    }

    pub fn size_valid(&self) -> bool {
        self.size_valid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn front(&self) -> &[Cell] {
        &self.front
    }

    pub fn back(&self) -> &[Cell] {
        &self.back
    }

    /// Back buffer for bulk drawing; marks the frame dirty.
    pub fn buffer_mut(&mut self) -> &mut [Cell] {
        self.dirty = true;
        &mut self.back
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !in_bounds(x, y, self.size.width as i32, self.size.height as i32) {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, cell: Cell) {
        if let Some(index) = self.index(x, y) {
            self.back[index] = cell;
            self.dirty = true;
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|index| self.back[index])
    }

    /// Writes `text` starting at (x, y) as UTF-16 units, clipped to the
    /// row. Returns the number of cells written.
    pub fn put_text(&mut self, x: i32, y: i32, text: &str, color: u16) -> i32 {
        let mut column = x;
        for unit in text.encode_utf16() {
            if column >= self.size.width as i32 {
                break;
            }
            self.put_pixel(column, y, Cell::new(unit, color));
            column += 1;
        }
        column - x
    }

    pub fn clear_back(&mut self) {
        self.back.fill(Cell::BLANK);
        self.dirty = true;
    }

    /// Forgets what the terminal shows so the next flush repaints everything.
    pub fn force_redraw(&mut self) {
        self.front.fill(Cell::STALE);
        self.dirty = true;
    }

    pub fn set_on_resize(&mut self, callback: SizeCallback) {
        self.on_resize = Some(callback);
    }

    pub fn set_on_size_invalid(&mut self, callback: SizeCallback) {
        self.on_size_invalid = Some(callback);
    }

    /// Overrides the size the terminal query reports.
    pub fn set_test_size(&mut self, width: u16, height: u16) {
        self.test_size = Some(Size::new(width, height));
    }

    pub fn simulate_winch(&self) {
        self.resize_pending.store(true, Ordering::Release);
    }

    /// Flag to hand to the SIGWINCH watcher.
    pub fn resize_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.resize_pending)
    }

    pub fn set_write_buffer_cap(&mut self, cap: usize) -> bool {
        match self.writer.resize_cap(cap.min(WRITE_BUFFER_CAP)) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(?error, cap, "write buffer resize failed");
                false
            }
        }
    }

    fn query_size(&self) -> io::Result<Size> {
        match self.test_size {
            Some(size) => Ok(size),
            None => terminal::terminal_size().map(|(width, height)| Size::new(width, height)),
        }
    }

    /// Applies a pending resize. Returns true when the buffers changed size.
    pub fn check_resize(&mut self) -> bool {
        if !self.resize_pending.swap(false, Ordering::AcqRel) {
            return false;
        }
        let size = match self.query_size() {
            Ok(size) => size,
            Err(error) => {
                tracing::warn!(?error, "terminal size query failed");
                return false;
            }
        };
        if size == self.size {
            return false;
        }

        let allocated = alloc_cells(size, Cell::STALE).and_then(|front| {
            let back = alloc_cells(size, Cell::BLANK)?;
            Ok((front, back))
        });
        let (front, mut back) = match allocated {
            Ok(buffers) => buffers,
            Err(error) => {
                tracing::warn!(%error, "resize allocation failed, keeping old buffers");
                self.resize_pending.store(true, Ordering::Release);
                return false;
            }
        };
        if let Err(error) = self.writer.resize_cap(write_buffer_len(size)) {
            tracing::warn!(?error, "write buffer resize failed, keeping old buffers");
            self.resize_pending.store(true, Ordering::Release);
            return false;
        }

        let copy_width = self.size.width.min(size.width) as usize;
        let copy_height = self.size.height.min(size.height) as usize;
        for row in 0..copy_height {
            let old = row * self.size.width as usize;
            let new = row * size.width as usize;
            back[new..new + copy_width].copy_from_slice(&self.back[old..old + copy_width]);
        }

        let was_valid = self.size_valid;
        self.front = front;
        self.back = back;
        self.size = size;
        self.size_valid = size.covers(self.min);
        self.dirty = true;
        // The terminal reflows on resize; start from a blank screen.
        let _ = self.out.write_all(b"\x1b[2J");
        tracing::debug!(width = size.width, height = size.height, valid = self.size_valid, "terminal resized");

        if let Some(callback) = self.on_resize.as_mut() {
            callback(size);
        }
        if was_valid && !self.size_valid {
            if let Some(callback) = self.on_size_invalid.as_mut() {
                callback(size);
            }
        }
        true
    }

    /// Emits the changed spans of the back buffer. Returns the number of
    /// bytes written. When the write buffer fills up the remaining spans
    /// wait for the next flush; nothing is sent half-written.
    pub fn flush(&mut self) -> Result<usize, TtyError> {
        if !self.dirty {
            return Ok(0);
        }
        self.writer.clear();
        let width = self.size.width as usize;
        let mut accepted: Vec<(usize, usize)> = Vec::new();
        let mut last_color: Option<u16> = None;
        let mut complete = true;

        'rows: for y in 0..self.size.height as usize {
            let row = y * width;
            let mut x = 0;
            while x < width {
                if self.back[row + x] == self.front[row + x] {
                    x += 1;
                    continue;
                }
                let mut start = x;
                if start > 0
                    && is_low_surrogate(self.back[row + start].code_unit)
                    && is_high_surrogate(self.back[row + start - 1].code_unit)
                {
                    start -= 1;
                }
                let color = self.back[row + x].color;
                let mut end = x + 1;
                // A pair pulled in from the left is drawn in its high half's
                // color, so the run closes after it.
                while start == x && end < width {
                    let cell = self.back[row + end];
                    if cell.color != color || cell == self.front[row + end] {
                        break;
                    }
                    end += 1;
                }
                if end < width
                    && is_high_surrogate(self.back[row + end - 1].code_unit)
                    && is_low_surrogate(self.back[row + end].code_unit)
                {
                    end += 1;
                }

                let mark = self.writer.len();
                let run = &self.back[row + start..row + end];
                if !emit_run(&mut self.writer, run, start, y, &mut last_color) {
                    self.writer.truncate(mark);
                    complete = false;
                    break 'rows;
                }
                accepted.push((row + start, row + end));
                x = end;
            }
        }

        let written = self.writer.len();
        if written > 0 {
            self.out.write_all(self.writer.as_bytes())?;
            self.out.flush()?;
        }
        for (start, end) in accepted {
            self.front[start..end].copy_from_slice(&self.back[start..end]);
        }
        if !complete {
            tracing::trace!(written, cap = self.writer.cap(), "write buffer full, frame deferred");
        }
        self.dirty = !complete;
        Ok(written)
    }
}

fn emit_run(
    writer: &mut BoundedWriter,
    run: &[Cell],
    x: usize,
    y: usize,
    last_color: &mut Option<u16>,
) -> bool {
    if write!(writer, "\x1b[{};{}H", y + 1, x + 1).is_err() {
        return false;
    }
    let color = run[0].color;
    if *last_color != Some(color) {
        if !palette::push_sequence(writer, color) {
            return false;
        }
        *last_color = Some(color);
    }
    let mut utf8 = [0u8; 4];
    let mut index = 0;
    while index < run.len() {
        let unit = run[index].code_unit;
        let ch = match run.get(index + 1) {
            Some(next) if is_high_surrogate(unit) && is_low_surrogate(next.code_unit) => {
                index += 1;
                combine_pair(unit, next.code_unit)
            }
            _ => unit_char(unit),
        };
        index += 1;
        if !writer.push(ch.encode_utf8(&mut utf8).as_bytes()) {
            return false;
        }
    }
    true
}

impl<W: Write> Drop for Tty<W> {
    fn drop(&mut self) {
        let result = self
            .out
            .write_all(TEARDOWN.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(error) = result {
            tracing::warn!(?error, "terminal teardown failed");
        }
    }
}

#[cfg(test)]
mod tests;
