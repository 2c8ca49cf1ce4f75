use crate::game::constants::MAX_PLAYERS;
use crate::game::input::{KeyBindings, PlayerKeys, KEY_ESCAPE};
use crate::game::sim::{PlayerSetup, SimConfig};
use crate::protocol::Limits;
use crate::shared::names::sanitize_player_name;
use crate::shared::validate::truncate_to_boundary;

pub const BOARD_MIN: i32 = 10;
pub const BOARD_MAX: i32 = 100;
pub const TICK_MIN_MS: u32 = 10;
pub const TICK_MAX_MS: u32 = 1000;
pub const SCREEN_WIDTH_MIN: u16 = 20;
pub const SCREEN_WIDTH_MAX: u16 = 4096;
pub const SCREEN_HEIGHT_MIN: u16 = 10;
pub const SCREEN_HEIGHT_MAX: u16 = 2160;
pub const MAX_LENGTH_MIN: usize = 2;
pub const MAX_LENGTH_MAX: usize = 10_000;
pub const MAX_FOOD_MIN: usize = 1;
pub const MAX_FOOD_MAX: usize = 256;
pub const MP_IDENTIFIER_MAX: usize = 36;
pub const MP_SESSION_MAX: usize = 15;

pub const DEFAULT_MP_HOST: &str = "mpapi.se";
pub const DEFAULT_MP_PORT: u16 = 9001;
pub const DEFAULT_MP_IDENTIFIER: &str = "67bdb04f-6e7c-4d76-81a3-191f7d78dd45";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderGlyphs {
    #[default]
    Utf8,
    Ascii,
}

impl RenderGlyphs {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "unicode" | "box" | "0" => Some(Self::Utf8),
            "ascii" | "legacy" | "1" => Some(Self::Ascii),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Ascii => "ascii",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    TwoD,
    #[default]
    ThreeD,
}

impl RenderMode {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "2d" => Some(Self::TwoD),
            "3d" => Some(Self::ThreeD),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoD => "2d",
            Self::ThreeD => "3d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    name: String,
    color: u32,
    key_left: Option<u8>,
    key_right: Option<u8>,
}

impl PlayerConfig {
    fn with_defaults(index: usize) -> Self {
        let keys = KeyBindings::default().players[index];
        Self {
            name: format!("Player{}", index + 1),
            color: 0,
            key_left: keys.left,
            key_right: keys.right,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn key_left(&self) -> Option<u8> {
        self.key_left
    }

    pub fn key_right(&self) -> Option<u8> {
        self.key_right
    }
}

/// Every tunable the game reads at startup. Setters clamp into the
/// documented ranges so a loaded file can never produce an unusable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    board_width: i32,
    board_height: i32,
    tick_rate_ms: u32,
    screen_width: u16,
    screen_height: u16,
    num_players: usize,
    max_players: usize,
    max_length: usize,
    max_food: usize,
    seed: u32,
    render_glyphs: RenderGlyphs,
    render_mode: RenderMode,
    enable_external_3d_view: bool,
    key_quit: u8,
    key_restart: u8,
    key_pause: u8,
    players: [PlayerConfig; MAX_PLAYERS],
    mp_enabled: bool,
    mp_server_host: String,
    mp_server_port: u16,
    mp_identifier: String,
    mp_session: String,
    unknown_keys: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: 18,
            board_height: 18,
            tick_rate_ms: 250,
            screen_width: 60,
            screen_height: 24,
            num_players: 2,
            max_players: 2,
            max_length: 1024,
            max_food: 3,
            seed: 42,
            render_glyphs: RenderGlyphs::Utf8,
            render_mode: RenderMode::ThreeD,
            enable_external_3d_view: true,
            key_quit: KEY_ESCAPE,
            key_restart: b'r',
            key_pause: b'p',
            players: std::array::from_fn(PlayerConfig::with_defaults),
            mp_enabled: false,
            mp_server_host: DEFAULT_MP_HOST.to_string(),
            mp_server_port: DEFAULT_MP_PORT,
            mp_identifier: DEFAULT_MP_IDENTIFIER.to_string(),
            mp_session: String::new(),
            unknown_keys: false,
        }
    }
}

impl GameConfig {
    pub fn board_width(&self) -> i32 {
        self.board_width
    }

    pub fn board_height(&self) -> i32 {
        self.board_height
    }

    pub fn set_board_size(&mut self, width: i64, height: i64) {
        self.board_width = width.clamp(BOARD_MIN as i64, BOARD_MAX as i64) as i32;
        self.board_height = height.clamp(BOARD_MIN as i64, BOARD_MAX as i64) as i32;
    }

    pub fn tick_rate_ms(&self) -> u32 {
        self.tick_rate_ms
    }

    pub fn set_tick_rate_ms(&mut self, tick: i64) {
        self.tick_rate_ms = tick.clamp(TICK_MIN_MS as i64, TICK_MAX_MS as i64) as u32;
    }

    /// Minimum terminal size the board is drawn at.
    pub fn screen_width(&self) -> u16 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u16 {
        self.screen_height
    }

    pub fn set_screen_size(&mut self, width: i64, height: i64) {
        self.screen_width = width.clamp(SCREEN_WIDTH_MIN as i64, SCREEN_WIDTH_MAX as i64) as u16;
        self.screen_height = height.clamp(SCREEN_HEIGHT_MIN as i64, SCREEN_HEIGHT_MAX as i64) as u16;
    }

    pub fn num_players(&self) -> usize {
        self.num_players
    }

    /// Raising the player count past `max_players` raises the maximum too.
    pub fn set_num_players(&mut self, count: i64) {
        let count = count.clamp(1, MAX_PLAYERS as i64) as usize;
        if count > self.max_players {
            self.max_players = count;
        }
        self.num_players = count;
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn set_max_players(&mut self, count: i64) {
        self.max_players = count.clamp(1, MAX_PLAYERS as i64) as usize;
        self.num_players = self.num_players.min(self.max_players);
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn set_max_length(&mut self, length: i64) {
        self.max_length = length.clamp(MAX_LENGTH_MIN as i64, MAX_LENGTH_MAX as i64) as usize;
    }

    pub fn max_food(&self) -> usize {
        self.max_food
    }

    pub fn set_max_food(&mut self, food: i64) {
        self.max_food = food.clamp(MAX_FOOD_MIN as i64, MAX_FOOD_MAX as i64) as usize;
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    pub fn render_glyphs(&self) -> RenderGlyphs {
        self.render_glyphs
    }

    pub fn set_render_glyphs(&mut self, glyphs: RenderGlyphs) {
        self.render_glyphs = glyphs;
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn enable_external_3d_view(&self) -> bool {
        self.enable_external_3d_view
    }

    pub fn set_enable_external_3d_view(&mut self, enabled: bool) {
        self.enable_external_3d_view = enabled;
    }

    pub fn key_quit(&self) -> u8 {
        self.key_quit
    }

    pub fn key_restart(&self) -> u8 {
        self.key_restart
    }

    pub fn key_pause(&self) -> u8 {
        self.key_pause
    }

    pub fn set_key_quit(&mut self, key: u8) {
        self.key_quit = key;
    }

    pub fn set_key_restart(&mut self, key: u8) {
        self.key_restart = key;
    }

    pub fn set_key_pause(&mut self, key: u8) {
        self.key_pause = key;
    }

    pub fn player(&self, index: usize) -> Option<&PlayerConfig> {
        self.players.get(index)
    }

    pub fn players(&self) -> &[PlayerConfig] {
        &self.players
    }

    pub fn set_player_name(&mut self, index: usize, name: &str) {
        if let Some(player) = self.players.get_mut(index) {
            player.name = sanitize_player_name(name, &format!("Player{}", index + 1));
        }
    }

    pub fn set_player_color(&mut self, index: usize, color: u32) {
        if let Some(player) = self.players.get_mut(index) {
            player.color = color;
        }
    }

    pub fn set_player_keys(&mut self, index: usize, left: Option<u8>, right: Option<u8>) {
        if let Some(player) = self.players.get_mut(index) {
            if left.is_some() {
                player.key_left = left;
            }
            if right.is_some() {
                player.key_right = right;
            }
        }
    }

    pub fn mp_enabled(&self) -> bool {
        self.mp_enabled
    }

    pub fn set_mp_enabled(&mut self, enabled: bool) {
        self.mp_enabled = enabled;
    }

    pub fn mp_server_host(&self) -> &str {
        &self.mp_server_host
    }

    pub fn set_mp_server_host(&mut self, host: &str) {
        let host = host.trim();
        if !host.is_empty() {
            self.mp_server_host = host.to_string();
        }
    }

    pub fn mp_server_port(&self) -> u16 {
        self.mp_server_port
    }

    pub fn set_mp_server_port(&mut self, port: u16) {
        if port != 0 {
            self.mp_server_port = port;
        }
    }

    pub fn mp_identifier(&self) -> &str {
        &self.mp_identifier
    }

    pub fn set_mp_identifier(&mut self, identifier: &str) {
        self.mp_identifier = truncate_to_boundary(identifier.trim(), MP_IDENTIFIER_MAX).to_string();
    }

    pub fn mp_session(&self) -> &str {
        &self.mp_session
    }

    pub fn set_mp_session(&mut self, session: &str) {
        self.mp_session = truncate_to_boundary(session.trim(), MP_SESSION_MAX).to_string();
    }

    pub fn has_unknown_keys(&self) -> bool {
        self.unknown_keys
    }

    pub(crate) fn mark_unknown_key(&mut self) {
        self.unknown_keys = true;
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            width: self.board_width,
            height: self.board_height,
            seed: self.seed,
            num_players: self.num_players,
            max_players: self.max_players,
            max_length: self.max_length,
            max_food: self.max_food,
            players: self.players[..self.num_players]
                .iter()
                .map(|player| PlayerSetup {
                    name: player.name.clone(),
                    color: player.color,
                })
                .collect(),
        }
    }

    pub fn key_bindings(&self) -> KeyBindings {
        KeyBindings {
            quit: self.key_quit,
            restart: self.key_restart,
            pause: self.key_pause,
            players: std::array::from_fn(|index| PlayerKeys {
                left: self.players[index].key_left,
                right: self.players[index].key_right,
            }),
        }
    }

    /// Decode limits for snapshots from peers running the same configuration.
    pub fn wire_limits(&self) -> Limits {
        Limits {
            max_players: self.max_players,
            max_food: self.max_food,
            max_length: self.max_length,
            max_dimension: BOARD_MAX,
        }
    }
}
