use super::atomic::write_atomic;
use super::PersistError;
use crate::config::{GameConfig, RenderGlyphs, RenderMode};
use crate::game::constants::MAX_PLAYERS;
use crate::game::input::KEY_ESCAPE;
use std::fmt::Write as _;
use std::path::Path;

const HEADER: &str = "# Snake Game Configuration";

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_key(value: &str) -> Option<u8> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("esc") || value.eq_ignore_ascii_case("escape") {
        return Some(KEY_ESCAPE);
    }
    match value.as_bytes() {
        [byte] if byte.is_ascii_graphic() => Some(*byte),
        _ => None,
    }
}

fn format_key(key: u8) -> String {
    if key == KEY_ESCAPE {
        "ESC".to_string()
    } else {
        (key as char).to_string()
    }
}

pub fn parse_color(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse::<u32>().ok(),
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Splits `pN_field` into a zero-based player index and the field name.
fn player_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix('p')?;
    let (number, field) = rest.split_once('_')?;
    let number: usize = number.parse().ok()?;
    if number == 0 || number > MAX_PLAYERS {
        return None;
    }
    Some((number - 1, field))
}

/// Legacy `key_left` / `key_left_N` bindings.
fn legacy_turn_key(key: &str) -> Option<(usize, bool)> {
    let (rest, is_left) = if let Some(rest) = key.strip_prefix("key_left") {
        (rest, true)
    } else if let Some(rest) = key.strip_prefix("key_right") {
        (rest, false)
    } else {
        return None;
    };
    if rest.is_empty() {
        return Some((0, is_left));
    }
    let number: usize = rest.strip_prefix('_')?.parse().ok()?;
    if number == 0 || number > MAX_PLAYERS {
        return None;
    }
    Some((number - 1, is_left))
}

enum Applied {
    Ok,
    BadValue,
    Unknown,
}

fn apply_player(config: &mut GameConfig, index: usize, field: &str, value: &str) -> Applied {
    match field {
        "name" => config.set_player_name(index, value),
        "color" => match parse_color(value) {
            Some(color) => config.set_player_color(index, color),
            None => return Applied::BadValue,
        },
        "left" | "right" => match parse_key(value) {
            Some(key) if field == "left" => config.set_player_keys(index, Some(key), None),
            Some(key) => config.set_player_keys(index, None, Some(key)),
            None => return Applied::BadValue,
        },
        _ => return Applied::Unknown,
    }
    Applied::Ok
}

fn apply_pair(config: &mut GameConfig, key: &str, value: &str) -> Applied {
    macro_rules! int_or_bail {
        ($value:expr) => {
            match parse_int($value) {
                Some(parsed) => parsed,
                None => return Applied::BadValue,
            }
        };
    }

    match key {
        "board_width" => {
            let width = int_or_bail!(value);
            config.set_board_size(width, config.board_height() as i64);
        }
        "board_height" => {
            let height = int_or_bail!(value);
            config.set_board_size(config.board_width() as i64, height);
        }
        "tick_rate_ms" => config.set_tick_rate_ms(int_or_bail!(value)),
        "screen_width" | "min_screen_width" => {
            let width = int_or_bail!(value);
            config.set_screen_size(width, config.screen_height() as i64);
        }
        "screen_height" | "min_screen_height" => {
            let height = int_or_bail!(value);
            config.set_screen_size(config.screen_width() as i64, height);
        }
        "num_players" => config.set_num_players(int_or_bail!(value)),
        "max_players" => config.set_max_players(int_or_bail!(value)),
        "max_length" => config.set_max_length(int_or_bail!(value)),
        "max_food" => config.set_max_food(int_or_bail!(value)),
        "seed" => match value.trim().parse::<u32>() {
            Ok(seed) => config.set_seed(seed),
            Err(_) => return Applied::BadValue,
        },
        "render_glyphs" | "glyphs" | "charset" => match RenderGlyphs::parse(value) {
            Some(glyphs) => config.set_render_glyphs(glyphs),
            None => return Applied::BadValue,
        },
        "render_mode" => match RenderMode::parse(value) {
            Some(mode) => config.set_render_mode(mode),
            None => return Applied::BadValue,
        },
        "enable_external_3d_view" => match parse_bool(value) {
            Some(enabled) => config.set_enable_external_3d_view(enabled),
            None => return Applied::BadValue,
        },
        "key_quit" | "key_restart" | "key_pause" => {
            let Some(byte) = parse_key(value) else {
                return Applied::BadValue;
            };
            match key {
                "key_quit" => config.set_key_quit(byte),
                "key_restart" => config.set_key_restart(byte),
                _ => config.set_key_pause(byte),
            }
        }
        "player_name" => config.set_player_name(0, value),
        "mp_enabled" => match parse_bool(value) {
            Some(enabled) => config.set_mp_enabled(enabled),
            None => return Applied::BadValue,
        },
        "mp_server_host" => config.set_mp_server_host(value),
        "mp_server_port" => match parse_int(value) {
            Some(port) if (1..=65_535).contains(&port) => config.set_mp_server_port(port as u16),
            _ => return Applied::BadValue,
        },
        "mp_identifier" => config.set_mp_identifier(value),
        "mp_session" | "mp_session_id" => config.set_mp_session(value),
        _ => {
            if let Some((index, is_left)) = legacy_turn_key(key) {
                let field = if is_left { "left" } else { "right" };
                return apply_player(config, index, field, value);
            }
            if let Some((index, field)) = player_key(key) {
                return apply_player(config, index, field, value);
            }
            return Applied::Unknown;
        }
    }
    Applied::Ok
}

/// Applies `key = value` lines on top of `config`. Bad values and unknown
/// keys skip their line; unknown keys are remembered on the config.
pub fn apply_config_text(config: &mut GameConfig, text: &str) {
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!(line = line_no + 1, "config line without '=' skipped");
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match apply_pair(config, &key, value) {
            Applied::Ok => {}
            Applied::BadValue => {
                tracing::warn!(line = line_no + 1, key = %key, value, "invalid config value ignored");
            }
            Applied::Unknown => {
                tracing::debug!(line = line_no + 1, key = %key, "unknown config key");
                config.mark_unknown_key();
            }
        }
    }
}

pub fn parse_config(text: &str) -> GameConfig {
    let mut config = GameConfig::default();
    apply_config_text(&mut config, text);
    config
}

pub fn format_config(config: &GameConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    let _ = writeln!(out, "board_width = {}", config.board_width());
    let _ = writeln!(out, "board_height = {}", config.board_height());
    let _ = writeln!(out, "tick_rate_ms = {}", config.tick_rate_ms());
    let _ = writeln!(out, "screen_width = {}", config.screen_width());
    let _ = writeln!(out, "screen_height = {}", config.screen_height());
    // max_players first so num_players is not clamped against the old maximum.
    let _ = writeln!(out, "max_players = {}", config.max_players());
    let _ = writeln!(out, "num_players = {}", config.num_players());
    let _ = writeln!(out, "max_length = {}", config.max_length());
    let _ = writeln!(out, "max_food = {}", config.max_food());
    let _ = writeln!(out, "seed = {}", config.seed());
    let _ = writeln!(out, "render_glyphs = {}", config.render_glyphs().as_str());
    let _ = writeln!(out, "render_mode = {}", config.render_mode().as_str());
    let _ = writeln!(
        out,
        "enable_external_3d_view = {}",
        u8::from(config.enable_external_3d_view())
    );
    let _ = writeln!(out, "key_quit = {}", format_key(config.key_quit()));
    let _ = writeln!(out, "key_restart = {}", format_key(config.key_restart()));
    let _ = writeln!(out, "key_pause = {}", format_key(config.key_pause()));
    for (index, player) in config.players().iter().enumerate() {
        let number = index + 1;
        let _ = writeln!(out, "p{number}_name = {}", player.name());
        let _ = writeln!(out, "p{number}_color = 0x{:08X}", player.color());
        if let Some(key) = player.key_left() {
            let _ = writeln!(out, "p{number}_left = {}", format_key(key));
        }
        if let Some(key) = player.key_right() {
            let _ = writeln!(out, "p{number}_right = {}", format_key(key));
        }
    }
    let _ = writeln!(out, "mp_enabled = {}", u8::from(config.mp_enabled()));
    let _ = writeln!(out, "mp_server_host = {}", config.mp_server_host());
    let _ = writeln!(out, "mp_server_port = {}", config.mp_server_port());
    let _ = writeln!(out, "mp_identifier = {}", config.mp_identifier());
    let _ = writeln!(out, "mp_session = {}", config.mp_session());
    out
}

pub fn load_config(path: &Path) -> Result<GameConfig, PersistError> {
    let bytes = std::fs::read(path).map_err(|err| PersistError::io(path, err))?;
    Ok(parse_config(&String::from_utf8_lossy(&bytes)))
}

pub fn save_config(path: &Path, config: &GameConfig) -> Result<(), PersistError> {
    write_atomic(path, format_config(config).as_bytes())
}

/// Loads `path`, writing a default file first when none exists. Any failure
/// falls back to defaults so the game can still start.
pub fn load_or_create(path: &Path) -> GameConfig {
    match load_config(path) {
        Ok(config) => {
            if config.has_unknown_keys() {
                tracing::info!(path = %path.display(), "config contains unknown keys");
            }
            config
        }
        Err(error) if error.is_not_found() => {
            let config = GameConfig::default();
            if let Err(error) = save_config(path, &config) {
                tracing::warn!(%error, "could not write default config");
            } else {
                tracing::info!(path = %path.display(), "wrote default config");
            }
            config
        }
        Err(error) => {
            tracing::warn!(%error, "could not read config, using defaults");
            GameConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::test_support::TempDir;

    #[test]
    fn values_are_trimmed_clamped_and_applied() {
        let text = "\
# comment
  board_width =  500
board_height=4
tick_rate_ms = 120
max_players = 4
num_players = 3
render_glyphs = ascii
render_mode = 2d
enable_external_3d_view = Off
key_quit = q
p2_left = a
p2_color = 0xFF102030
p3_color = 255
p1_name =  Long   Name
";
        let config = parse_config(text);
        assert_eq!(config.board_width(), 100);
        assert_eq!(config.board_height(), 10);
        assert_eq!(config.tick_rate_ms(), 120);
        assert_eq!((config.num_players(), config.max_players()), (3, 4));
        assert_eq!(config.render_glyphs(), RenderGlyphs::Ascii);
        assert_eq!(config.render_mode(), RenderMode::TwoD);
        assert!(!config.enable_external_3d_view());
        assert_eq!(config.key_quit(), b'q');
        let p2 = config.player(1).expect("p2");
        assert_eq!(p2.key_left(), Some(b'a'));
        assert_eq!(p2.key_right(), Some(b'q'));
        assert_eq!(p2.color(), 0xFF10_2030);
        assert_eq!(config.player(2).map(|p| p.color()), Some(255));
        assert_eq!(config.player(0).map(|p| p.name()), Some("Long Name"));
        assert!(!config.has_unknown_keys());
    }

    #[test]
    fn unknown_keys_are_flagged_but_valid_keys_apply() {
        let config = parse_config("mystery = 1\nseed = 7\np9_name = x\n");
        assert!(config.has_unknown_keys());
        assert_eq!(config.seed(), 7);
    }

    #[test]
    fn bad_values_leave_defaults() {
        let config = parse_config("board_width = wide\nmp_server_port = 70000\nmp_enabled = maybe\nkey_pause = ab\n");
        let defaults = GameConfig::default();
        assert_eq!(config.board_width(), defaults.board_width());
        assert_eq!(config.mp_server_port(), defaults.mp_server_port());
        assert!(!config.mp_enabled());
        assert_eq!(config.key_pause(), b'p');
        assert!(!config.has_unknown_keys());
    }

    #[test]
    fn aliases() {
        let config = parse_config(
            "charset = legacy\nplayer_name = Zed\nkey_left_2 = z\nkey_right = k\nmp_session_id = room1\nmin_screen_width = 80\n",
        );
        assert_eq!(config.render_glyphs(), RenderGlyphs::Ascii);
        assert_eq!(config.player(0).map(|p| p.name()), Some("Zed"));
        assert_eq!(config.player(1).and_then(|p| p.key_left()), Some(b'z'));
        assert_eq!(config.player(0).and_then(|p| p.key_right()), Some(b'k'));
        assert_eq!(config.mp_session(), "room1");
        assert_eq!(config.screen_width(), 80);
    }

    #[test]
    fn escape_token_and_booleans() {
        assert_eq!(parse_key("ESC"), Some(KEY_ESCAPE));
        assert_eq!(parse_key(" x "), Some(b'x'));
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_color("0xff000000"), Some(0xFF00_0000));
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = TempDir::new();
        let path = dir.file("snake.cfg");
        let mut config = GameConfig::default();
        config.set_board_size(30, 20);
        config.set_num_players(4);
        config.set_max_players(3);
        config.set_seed(u32::MAX);
        config.set_render_glyphs(RenderGlyphs::Ascii);
        config.set_key_restart(b'n');
        config.set_player_name(3, "Four");
        config.set_player_color(1, 0xFF00_FF00);
        config.set_mp_enabled(true);
        config.set_mp_session("abc");

        save_config(&path, &config).expect("save");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with(HEADER));
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, config);

        save_config(&path, &loaded).expect("save again");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), text);
    }

    #[test]
    fn missing_file_gets_defaults_written() {
        let dir = TempDir::new();
        let path = dir.file("snake.cfg");
        let config = load_or_create(&path);
        assert_eq!(config, GameConfig::default());
        assert!(path.exists());
        assert_eq!(load_config(&path).expect("load"), GameConfig::default());
    }
}
