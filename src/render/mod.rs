//! 2D renderer: draws a `GameState` into the terminal back buffer.

use crate::config::RenderGlyphs;
use crate::game::input::KEY_ESCAPE;
use crate::game::types::{GameState, GameStatus};
use crate::persist::scores::HighScore;
use crate::protocol::StateFrame;
use crate::shared::validate::{bounded_format, rect_in_bounds};
use crate::tty::palette::{self, pack};
use crate::tty::{Cell, Size, Tty};
use std::io::Write;

const TEXT_CAP: usize = 96;
const HUD_GAP: i32 = 2;
const HUD_WIDTH: i32 = 18;

struct Glyphs {
    horizontal: char,
    vertical: char,
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    food: char,
    head: char,
    body: char,
    heart: &'static str,
    bar: char,
}

static UTF8_GLYPHS: Glyphs = Glyphs {
    horizontal: '─',
    vertical: '│',
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    food: '*',
    head: '●',
    body: '○',
    heart: "♥",
    bar: '═',
};

static ASCII_GLYPHS: Glyphs = Glyphs {
    horizontal: '-',
    vertical: '|',
    top_left: '+',
    top_right: '+',
    bottom_left: '+',
    bottom_right: '+',
    food: '*',
    head: '@',
    body: 'o',
    heart: "<3",
    bar: '=',
};

const TEXT: u16 = pack(palette::WHITE, palette::BLACK);
const DIM: u16 = pack(palette::BRIGHT_BLACK, palette::BLACK);
const TITLE: u16 = pack(palette::BLACK, palette::GREEN);
const FOOD: u16 = pack(palette::BRIGHT_GREEN, palette::BLACK);
const HEART: u16 = pack(palette::BRIGHT_RED, palette::BLACK);
const ALERT: u16 = pack(palette::BRIGHT_WHITE, palette::RED);

/// Screen position of the bordered play field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub field_x: i32,
    pub field_y: i32,
    pub field_w: i32,
    pub field_h: i32,
}

impl Layout {
    pub fn for_board(size: Size, board_w: i32, board_h: i32) -> Self {
        let field_w = board_w + 2;
        let field_h = board_h + 2;
        let total_w = field_w + HUD_GAP + HUD_WIDTH;
        let field_x = ((size.width as i32 - total_w) / 2).max(1);
        let field_y = ((size.height as i32 - field_h) / 2).max(2);
        Self {
            field_x,
            field_y,
            field_w,
            field_h,
        }
    }

    pub fn cell(&self, x: i32, y: i32) -> (i32, i32) {
        (self.field_x + 1 + x, self.field_y + 1 + y)
    }

    pub fn hud_x(&self) -> i32 {
        self.field_x + self.field_w + HUD_GAP
    }

    pub fn fits(&self, size: Size) -> bool {
        rect_in_bounds(
            self.field_x,
            self.field_y,
            self.field_w,
            self.field_h,
            size.width as i32,
            size.height as i32,
        )
    }
}

/// Everything besides the game state shown around the field.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hud<'a> {
    pub high_scores: &'a [HighScore],
    pub remote: Option<&'a StateFrame>,
    pub session: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Death { score: u32 },
    GameOver,
    TooSmall { need: Size },
}

pub fn key_label(key: u8) -> String {
    if key == KEY_ESCAPE {
        "ESC".to_string()
    } else {
        (key as char).to_ascii_uppercase().to_string()
    }
}

fn text(args: std::fmt::Arguments<'_>) -> String {
    bounded_format(TEXT_CAP, args).unwrap_or_default()
}

pub struct Renderer {
    glyphs: &'static Glyphs,
    quit: String,
    restart: String,
    pause: String,
}

impl Renderer {
    pub fn new(glyphs: RenderGlyphs, quit: u8, restart: u8, pause: u8) -> Self {
        let glyphs = match glyphs {
            RenderGlyphs::Utf8 => &UTF8_GLYPHS,
            RenderGlyphs::Ascii => &ASCII_GLYPHS,
        };
        Self {
            glyphs,
            quit: key_label(quit),
            restart: key_label(restart),
            pause: key_label(pause),
        }
    }

    pub fn player_color(index: usize, argb: u32) -> u16 {
        if index == 0 {
            return pack(palette::BRIGHT_YELLOW, palette::BLACK);
        }
        let fg = match palette::nearest_ansi(argb) {
            palette::BLACK => palette::WHITE,
            fg => fg,
        };
        pack(fg, palette::BLACK)
    }

    /// Full frame: chrome, field, snakes, food and HUD.
    pub fn draw<W: Write>(&self, tty: &mut Tty<W>, state: &GameState, hud: &Hud<'_>) -> Layout {
        tty.clear_back();
        let size = tty.size();
        let layout = Layout::for_board(size, state.width, state.height);

        self.draw_top_bar(tty, size);
        self.draw_status(tty, state, hud);
        self.draw_field(tty, &layout);

        for food in &state.food {
            let (x, y) = layout.cell(food.x, food.y);
            tty.put_pixel(x, y, Cell::from_char(self.glyphs.food, FOOD));
        }
        for (index, player) in state.players.iter().enumerate() {
            if !player.active {
                continue;
            }
            let color = Self::player_color(index, player.color);
            for (segment_index, segment) in player.body.iter().enumerate().rev() {
                let glyph = if segment_index == 0 {
                    self.glyphs.head
                } else {
                    self.glyphs.body
                };
                let (x, y) = layout.cell(segment.x, segment.y);
                tty.put_pixel(x, y, Cell::from_char(glyph, color));
            }
        }

        self.draw_hud(tty, &layout, state, hud);
        self.draw_help(tty, size);
        layout
    }

    fn draw_top_bar<W: Write>(&self, tty: &mut Tty<W>, size: Size) {
        for x in 0..size.width as i32 {
            tty.put_pixel(x, 0, Cell::from_char(self.glyphs.bar, DIM));
        }
        let title = " SNAKE ";
        let x = (size.width as i32 - title.len() as i32) / 2;
        tty.put_text(x.max(0), 0, title, TITLE);
    }

    fn draw_status<W: Write>(&self, tty: &mut Tty<W>, state: &GameState, hud: &Hud<'_>) {
        let status = match state.status {
            GameStatus::Running => "RUNNING",
            GameStatus::Paused => "PAUSED",
            GameStatus::GameOver => "GAME OVER",
        };
        let line = match hud.session {
            Some(session) => text(format_args!(" {status}  session {session}")),
            None => text(format_args!(" {status}")),
        };
        tty.put_text(0, 1, &line, TEXT);
    }

    fn draw_field<W: Write>(&self, tty: &mut Tty<W>, layout: &Layout) {
        let g = self.glyphs;
        let left = layout.field_x;
        let top = layout.field_y;
        let right = left + layout.field_w - 1;
        let bottom = top + layout.field_h - 1;
        for x in left + 1..right {
            tty.put_pixel(x, top, Cell::from_char(g.horizontal, TEXT));
            tty.put_pixel(x, bottom, Cell::from_char(g.horizontal, TEXT));
        }
        for y in top + 1..bottom {
            tty.put_pixel(left, y, Cell::from_char(g.vertical, TEXT));
            tty.put_pixel(right, y, Cell::from_char(g.vertical, TEXT));
        }
        tty.put_pixel(left, top, Cell::from_char(g.top_left, TEXT));
        tty.put_pixel(right, top, Cell::from_char(g.top_right, TEXT));
        tty.put_pixel(left, bottom, Cell::from_char(g.bottom_left, TEXT));
        tty.put_pixel(right, bottom, Cell::from_char(g.bottom_right, TEXT));
    }

    fn draw_hud<W: Write>(&self, tty: &mut Tty<W>, layout: &Layout, state: &GameState, hud: &Hud<'_>) {
        let x = layout.hud_x();
        let mut y = layout.field_y;
        for (index, player) in state.players.iter().enumerate() {
            let color = Self::player_color(index, player.color);
            let line = text(format_args!("{}: {}", player.name, player.score));
            tty.put_text(x, y, &line, color);
            if player.eliminated {
                tty.put_text(x, y + 1, "out", DIM);
            } else {
                let mut column = x;
                for _ in 0..player.lives {
                    column += tty.put_text(column, y + 1, self.glyphs.heart, HEART);
                }
            }
            y += 2;
        }

        if let Some(remote) = hud.remote {
            y += 1;
            tty.put_text(x, y, "Remote", DIM);
            y += 1;
            for (index, player) in remote.players.iter().enumerate() {
                let line = text(format_args!("P{}: {} ({})", index + 1, player.score, player.length));
                tty.put_text(x, y, &line, TEXT);
                y += 1;
            }
        }

        if !hud.high_scores.is_empty() {
            y += 1;
            tty.put_text(x, y, "High scores", DIM);
            y += 1;
            for entry in hud.high_scores {
                let line = text(format_args!("{:<8} {:>6}", entry.name, entry.score));
                tty.put_text(x, y, &line, TEXT);
                y += 1;
            }
        }
    }

    fn draw_help<W: Write>(&self, tty: &mut Tty<W>, size: Size) {
        let line = text(format_args!(
            " arrows: steer  {}: pause  {}: restart  {}: quit",
            self.pause, self.restart, self.quit
        ));
        tty.put_text(0, size.height as i32 - 1, &line, DIM);
    }

    /// Centered message box drawn over whatever the back buffer holds.
    pub fn draw_overlay<W: Write>(&self, tty: &mut Tty<W>, overlay: &Overlay, high_scores: &[HighScore]) {
        let lines: Vec<String> = match overlay {
            Overlay::Death { score } => vec![
                "YOU DIED".to_string(),
                text(format_args!("Score: {score}")),
                "Press any key to restart".to_string(),
                text(format_args!("or {} to quit", self.quit)),
            ],
            Overlay::GameOver => {
                let mut lines = vec!["GAME OVER".to_string()];
                for entry in high_scores {
                    lines.push(text(format_args!("{:<8} {:>6}", entry.name, entry.score)));
                }
                lines.push(text(format_args!("{}: restart  {}: quit", self.restart, self.quit)));
                lines
            }
            Overlay::TooSmall { need } => {
                tty.clear_back();
                let have = tty.size();
                vec![
                    "Terminal too small".to_string(),
                    text(format_args!("need {}x{}, have {}x{}", need.width, need.height, have.width, have.height)),
                    "Resize to continue".to_string(),
                ]
            }
        };
        self.draw_box(tty, &lines);
    }

    fn draw_box<W: Write>(&self, tty: &mut Tty<W>, lines: &[String]) {
        let size = tty.size();
        let inner = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0) as i32 + 2;
        let height = lines.len() as i32;
        let left = ((size.width as i32 - inner) / 2).max(0);
        let top = ((size.height as i32 - height) / 2).max(0);
        for row in 0..height {
            for column in 0..inner {
                tty.put_pixel(left + column, top + row, Cell::from_char(' ', ALERT));
            }
        }
        for (row, line) in lines.iter().enumerate() {
            let offset = (inner - line.chars().count() as i32) / 2;
            tty.put_text(left + offset, top + row as i32, line, ALERT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::sim::{SimConfig, Simulation};

    fn make_sim() -> Simulation {
        Simulation::new(&SimConfig {
            width: 10,
            height: 10,
            seed: 5,
            num_players: 2,
            max_players: 2,
            max_length: 16,
            max_food: 3,
            players: Vec::new(),
        })
        .expect("sim")
    }

    fn make_tty() -> Tty<Vec<u8>> {
        let size = Size::new(60, 24);
        Tty::with_writer(Vec::new(), size, size).expect("tty")
    }

    fn row_text(tty: &Tty<Vec<u8>>, y: i32) -> String {
        (0..tty.size().width as i32)
            .filter_map(|x| tty.get_pixel(x, y))
            .map(|cell| char::from_u32(cell.code_unit as u32).unwrap_or('?'))
            .collect()
    }

    fn screen_text(tty: &Tty<Vec<u8>>) -> String {
        (0..tty.size().height as i32)
            .map(|y| row_text(tty, y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn draws_chrome_snakes_and_food() {
        let sim = make_sim();
        let mut tty = make_tty();
        let renderer = Renderer::new(RenderGlyphs::Utf8, KEY_ESCAPE, b'r', b'p');
        let layout = renderer.draw(&mut tty, sim.state(), &Hud::default());

        assert!(layout.fits(tty.size()));
        assert!(layout.field_x >= 1 && layout.field_y >= 2);
        assert!(row_text(&tty, 0).contains(" SNAKE "));
        assert!(row_text(&tty, 1).contains("RUNNING"));
        assert!(row_text(&tty, 23).contains("ESC: quit"));
        assert_eq!(
            tty.get_pixel(layout.field_x, layout.field_y),
            Some(Cell::from_char('┌', TEXT))
        );

        let player = &sim.state().players[0];
        let head = player.head().expect("spawned");
        let (x, y) = layout.cell(head.x, head.y);
        assert_eq!(tty.get_pixel(x, y), Some(Cell::from_char('●', Renderer::player_color(0, player.color))));
        let tail = player.tail().expect("spawned");
        let (x, y) = layout.cell(tail.x, tail.y);
        assert_eq!(tty.get_pixel(x, y).map(|cell| cell.code_unit), Some('○' as u16));

        for food in &sim.state().food {
            let (x, y) = layout.cell(food.x, food.y);
            assert_eq!(tty.get_pixel(x, y), Some(Cell::from_char('*', FOOD)));
        }

        let hud = row_text(&tty, layout.field_y);
        assert!(hud.contains("Player1: 0"));
        assert_eq!(row_text(&tty, layout.field_y + 1).matches('♥').count(), 3);
    }

    #[test]
    fn ascii_glyphs_and_high_scores() {
        let sim = make_sim();
        let mut tty = make_tty();
        let renderer = Renderer::new(RenderGlyphs::Ascii, KEY_ESCAPE, b'r', b'p');
        let scores = vec![HighScore {
            name: "ann".to_string(),
            score: 12,
        }];
        let hud = Hud {
            high_scores: &scores,
            ..Hud::default()
        };
        let layout = renderer.draw(&mut tty, sim.state(), &hud);
        assert_eq!(tty.get_pixel(layout.field_x, layout.field_y).map(|c| c.code_unit), Some('+' as u16));
        let screen = screen_text(&tty);
        assert!(screen.contains("High scores"));
        assert!(screen.contains("ann"));
        assert!(screen.contains("<3<3<3"));
    }

    #[test]
    fn overlays_show_their_messages() {
        let sim = make_sim();
        let mut tty = make_tty();
        let renderer = Renderer::new(RenderGlyphs::Utf8, b'q', b'r', b'p');
        renderer.draw(&mut tty, sim.state(), &Hud::default());

        renderer.draw_overlay(&mut tty, &Overlay::Death { score: 4 }, &[]);
        let screen = screen_text(&tty);
        assert!(screen.contains("YOU DIED"));
        assert!(screen.contains("Score: 4"));
        assert!(screen.contains("or Q to quit"));

        renderer.draw_overlay(&mut tty, &Overlay::TooSmall { need: Size::new(80, 30) }, &[]);
        let screen = screen_text(&tty);
        assert!(screen.contains("Terminal too small"));
        assert!(screen.contains("need 80x30, have 60x24"));
        assert!(!screen.contains("SNAKE"));
    }

    #[test]
    fn key_labels() {
        assert_eq!(key_label(KEY_ESCAPE), "ESC");
        assert_eq!(key_label(b'r'), "R");
    }
}
