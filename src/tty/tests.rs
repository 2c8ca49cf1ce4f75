
use super::*;
use parking_lot::Mutex;
use std::sync::atomic::AtomicUsize;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn make_tty(width: u16, height: u16) -> Tty<Vec<u8>> {
    let size = Size::new(width, height);
    let mut tty = Tty::with_writer(Vec::new(), size, size).expect("tty");
    tty.get_mut().clear();
    tty
}

fn take_output(tty: &mut Tty<Vec<u8>>) -> Vec<u8> {
    std::mem::take(tty.get_mut())
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|window| *window == needle).count()
}

fn cursor_moves(out: &[u8]) -> usize {
    let mut moves = 0;
    let mut index = 0;
    while index + 1 < out.len() {
        if out[index] == 0x1b && out[index + 1] == b'[' {
            let mut end = index + 2;
            while end < out.len() && (out[end].is_ascii_digit() || out[end] == b';') {
                end += 1;
            }
            if end < out.len() && out[end] == b'H' {
                moves += 1;
            }
            index = end;
        } else {
            index += 1;
        }
    }
    moves
}

const GREEN_ON_BLACK: u16 = palette::pack(palette::GREEN, palette::BLACK);

#[test]
fn single_cell_flush_emits_minimal_sequence() {
    let mut tty = make_tty(80, 24);
    tty.put_pixel(0, 0, Cell::from_char('X', GREEN_ON_BLACK));

    let written = tty.flush().expect("flush");
    let out = take_output(&mut tty);

    assert_eq!(out, b"\x1b[1;1H\x1b[32m\x1b[40mX");
    assert_eq!(written, out.len());
    assert_eq!(cursor_moves(&out), 1);
    assert_eq!(tty.front()[0], tty.back()[0]);

    assert_eq!(tty.flush().expect("flush"), 0);
    assert!(tty.get_ref().is_empty());
}

#[test]
fn same_color_cells_coalesce_into_one_run() {
    let mut tty = make_tty(20, 4);
    tty.put_text(2, 1, "ABC", GREEN_ON_BLACK);
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(out, b"\x1b[2;3H\x1b[32m\x1b[40mABC");
}

#[test]
fn palette_is_emitted_once_for_consecutive_runs() {
    let mut tty = make_tty(20, 4);
    tty.put_pixel(0, 0, Cell::from_char('a', GREEN_ON_BLACK));
    tty.put_pixel(5, 2, Cell::from_char('b', GREEN_ON_BLACK));
    tty.put_pixel(6, 2, Cell::from_char('c', palette::pack(palette::RED, palette::BLACK)));
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(cursor_moves(&out), 3);
    assert_eq!(count(&out, b"\x1b[32m"), 1);
    assert_eq!(count(&out, b"\x1b[31m"), 1);
}

#[test]
fn surrogate_pairs_become_one_utf8_sequence() {
    let mut tty = make_tty(20, 2);
    tty.put_pixel(0, 0, Cell::new(0xD83D, GREEN_ON_BLACK));
    tty.put_pixel(1, 0, Cell::new(0xDE00, GREEN_ON_BLACK));
    tty.put_pixel(5, 0, Cell::new(0xD83D, GREEN_ON_BLACK));
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(count(&out, &[0xF0, 0x9F, 0x98, 0x80]), 1);
    assert_eq!(count(&out, "\u{FFFD}".as_bytes()), 1);
}

#[test]
fn pair_split_by_color_is_still_joined() {
    let mut tty = make_tty(20, 2);
    tty.put_pixel(3, 0, Cell::new(0xD83D, GREEN_ON_BLACK));
    tty.put_pixel(4, 0, Cell::new(0xDE00, palette::pack(palette::RED, palette::BLACK)));
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(count(&out, &[0xF0, 0x9F, 0x98, 0x80]), 1);
    assert_eq!(count(&out, "\u{FFFD}".as_bytes()), 0);
    assert_eq!(tty.front(), tty.back());
}

#[test]
fn cells_after_a_repainted_pair_keep_their_color() {
    let red = palette::pack(palette::RED, palette::BLACK);
    let mut tty = make_tty(20, 2);
    tty.put_pixel(3, 0, Cell::new(0xD83D, GREEN_ON_BLACK));
    tty.put_pixel(4, 0, Cell::new(0xDE00, red));
    tty.flush().expect("flush");
    take_output(&mut tty);

    tty.put_pixel(4, 0, Cell::new(0xDE01, red));
    tty.put_pixel(5, 0, Cell::from_char('a', red));
    tty.flush().expect("flush");
    let out = take_output(&mut tty);

    let pair = "\u{1F601}".as_bytes();
    let pair_at = out.windows(pair.len()).position(|window| window == pair).expect("pair emitted");
    let red_at = out.windows(5).position(|window| window == b"\x1b[31m").expect("red emitted");
    let a_at = out.iter().rposition(|byte| *byte == b'a').expect("a emitted");
    assert!(pair_at < red_at && red_at < a_at);
    assert_eq!(tty.front(), tty.back());
}

#[test]
fn full_write_buffer_defers_remaining_runs() {
    let mut tty = make_tty(10, 3);
    let color = Cell::BLANK.color;
    tty.put_pixel(0, 0, Cell::from_char('A', color));
    tty.put_pixel(0, 1, Cell::from_char('B', color));
    tty.put_pixel(0, 2, Cell::from_char('C', color));
    assert!(tty.set_write_buffer_cap(20));

    let written = tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(out, b"\x1b[1;1H\x1b[37m\x1b[40mA");
    assert_eq!(written, out.len());
    assert!(tty.is_dirty());
    assert_eq!(tty.front()[0], tty.back()[0]);
    assert_ne!(tty.front()[10], tty.back()[10]);

    assert!(tty.set_write_buffer_cap(64));
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(out, b"\x1b[2;1H\x1b[37m\x1b[40mB\x1b[3;1HC");
    assert!(!tty.is_dirty());
    assert_eq!(tty.front(), tty.back());
    assert_eq!(tty.flush().expect("flush"), 0);
}

#[test]
fn force_redraw_repaints_every_cell() {
    let mut tty = make_tty(4, 2);
    tty.force_redraw();
    tty.flush().expect("flush");
    let out = take_output(&mut tty);
    assert_eq!(out, b"\x1b[1;1H\x1b[37m\x1b[40m    \x1b[2;1H    ");
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let mut tty = make_tty(8, 2);
    tty.put_pixel(-1, 0, Cell::from_char('x', GREEN_ON_BLACK));
    tty.put_pixel(8, 0, Cell::from_char('x', GREEN_ON_BLACK));
    tty.put_pixel(0, 2, Cell::from_char('x', GREEN_ON_BLACK));
    assert!(!tty.is_dirty());
    assert_eq!(tty.get_pixel(8, 0), None);
    assert_eq!(tty.put_text(6, 1, "abcdef", GREEN_ON_BLACK), 2);
}

#[test]
fn resize_keeps_overlap_and_reports_transitions() {
    let min = Size::new(80, 24);
    let mut tty = Tty::with_writer(Vec::new(), min, min).expect("tty");
    let resized = Arc::new(AtomicUsize::new(0));
    let invalid = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resized);
    tty.set_on_resize(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let counter = Arc::clone(&invalid);
    tty.set_on_size_invalid(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    tty.put_pixel(1, 1, Cell::from_char('Q', GREEN_ON_BLACK));

    assert!(!tty.check_resize());

    tty.set_test_size(100, 30);
    tty.simulate_winch();
    assert!(tty.check_resize());
    assert_eq!(tty.size(), Size::new(100, 30));
    assert!(tty.size_valid());
    assert_eq!(tty.get_pixel(1, 1), Some(Cell::from_char('Q', GREEN_ON_BLACK)));
    assert!(tty.is_dirty());

    tty.set_test_size(40, 10);
    tty.simulate_winch();
    assert!(tty.check_resize());
    assert!(!tty.size_valid());
    assert_eq!(tty.get_pixel(1, 1), Some(Cell::from_char('Q', GREEN_ON_BLACK)));

    tty.set_test_size(30, 10);
    tty.simulate_winch();
    assert!(tty.check_resize());

    tty.simulate_winch();
    assert!(!tty.check_resize());

    assert_eq!(resized.load(Ordering::SeqCst), 3);
    assert_eq!(invalid.load(Ordering::SeqCst), 1);
}

#[test]
fn oversized_resize_keeps_current_buffers() {
    let mut tty = make_tty(10, 5);
    tty.put_pixel(2, 2, Cell::from_char('k', GREEN_ON_BLACK));
    tty.set_test_size(u16::MAX, u16::MAX);
    tty.simulate_winch();
    assert!(!tty.check_resize());
    assert_eq!(tty.size(), Size::new(10, 5));
    assert_eq!(tty.get_pixel(2, 2), Some(Cell::from_char('k', GREEN_ON_BLACK)));
    assert!(tty.resize_flag().load(Ordering::Acquire));
}

#[test]
fn setup_and_teardown_sequences() {
    let shared = SharedBuf::default();
    let size = Size::new(10, 4);
    let tty = Tty::with_writer(shared.clone(), size, size).expect("tty");
    assert_eq!(shared.0.lock().as_slice(), SETUP.as_bytes());
    drop(tty);
    let out = shared.0.lock().clone();
    assert!(out.ends_with(TEARDOWN.as_bytes()));
}

#[test]
fn small_terminal_is_flagged_invalid() {
    let tty = Tty::with_writer(Vec::new(), Size::new(40, 10), Size::new(60, 24)).expect("tty");
    assert!(!tty.size_valid());
}
