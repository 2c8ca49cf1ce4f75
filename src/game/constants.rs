pub const MAX_PLAYERS: usize = 4;
pub const INITIAL_LENGTH: usize = 2;
pub const INITIAL_LIVES: u32 = 3;
pub const SPAWN_MAX_ATTEMPTS: usize = 1000;
pub const SPAWN_MARGIN: i32 = 2;
pub const FOOD_RESPAWN_MIN: i32 = 1;
pub const FOOD_RESPAWN_MAX: i32 = 3;
pub const FOOD_MIN_ATTEMPTS: usize = 32;
pub const CELL_CENTER: f32 = 0.5;

pub const DEFAULT_PLAYER_COLORS: [u32; MAX_PLAYERS] = [
  0xFF00_8000,
  0xFF00_C8FF,
  0xFFFF_F700,
  0xFFFF_00FF,
];
