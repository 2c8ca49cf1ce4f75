use super::constants::{CELL_CENTER, INITIAL_LIVES};
use super::direction::Direction;
use super::rng::XorShift32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnakePoint {
  pub x: i32,
  pub y: i32,
}

impl SnakePoint {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  pub fn center(self) -> InterpPoint {
    InterpPoint {
      x: self.x as f32 + CELL_CENTER,
      y: self.y as f32 + CELL_CENTER,
    }
  }
}

/// Cell-centered float position kept for one tick so a renderer can
/// interpolate between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterpPoint {
  pub x: f32,
  pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
  #[default]
  Running,
  Paused,
  GameOver,
}

impl GameStatus {
  pub fn to_wire(self) -> u32 {
    match self {
      GameStatus::Running => 0,
      GameStatus::Paused => 1,
      GameStatus::GameOver => 2,
    }
  }

  pub fn from_wire(value: u32) -> Option<Self> {
    match value {
      0 => Some(GameStatus::Running),
      1 => Some(GameStatus::Paused),
      2 => Some(GameStatus::GameOver),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Unspawned,
  Active,
  MarkedForReset,
  Eliminated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
  pub current_dir: Direction,
  pub queued_dir: Direction,
  /// Head at index 0. Capacity is reserved once for `max_length` cells.
  pub body: Vec<SnakePoint>,
  pub prev_head: InterpPoint,
  pub prev_segments: Vec<InterpPoint>,
  pub score: u32,
  pub score_at_death: u32,
  pub died_this_tick: bool,
  pub active: bool,
  pub needs_reset: bool,
  pub eliminated: bool,
  pub lives: u32,
  pub name: String,
  pub color: u32,
}

impl PlayerState {
  pub fn new(max_length: usize, name: String, color: u32) -> Self {
    Self {
      current_dir: Direction::Up,
      queued_dir: Direction::Up,
      body: Vec::with_capacity(max_length),
      prev_head: InterpPoint::default(),
      prev_segments: Vec::with_capacity(max_length),
      score: 0,
      score_at_death: 0,
      died_this_tick: false,
      active: false,
      needs_reset: false,
      eliminated: false,
      lives: INITIAL_LIVES,
      name,
      color,
    }
  }

  pub fn length(&self) -> usize {
    self.body.len()
  }

  pub fn head(&self) -> Option<SnakePoint> {
    self.body.first().copied()
  }

  pub fn tail(&self) -> Option<SnakePoint> {
    self.body.last().copied()
  }

  /// Whether a live segment of this snake covers `point`.
  pub fn occupies(&self, point: SnakePoint) -> bool {
    self.active && self.body.contains(&point)
  }

  pub fn lifecycle(&self) -> Lifecycle {
    if self.eliminated {
      Lifecycle::Eliminated
    } else if !self.active {
      Lifecycle::Unspawned
    } else if self.needs_reset {
      Lifecycle::MarkedForReset
    } else {
      Lifecycle::Active
    }
  }

  pub(crate) fn clear_body(&mut self) {
    self.body.clear();
    self.prev_segments.clear();
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
  pub width: i32,
  pub height: i32,
  pub rng: XorShift32,
  pub status: GameStatus,
  pub players: Vec<PlayerState>,
  pub food: Vec<SnakePoint>,
  pub last_food_respawned: bool,
  pub max_length: usize,
  pub max_food: usize,
  pub max_players: usize,
}

impl GameState {
  pub fn num_players(&self) -> usize {
    self.players.len()
  }

  pub fn rng_state(&self) -> u32 {
    self.rng.state()
  }

  pub fn in_bounds(&self, point: SnakePoint) -> bool {
    crate::shared::validate::in_bounds(point.x, point.y, self.width, self.height)
  }

  pub fn is_food(&self, point: SnakePoint) -> bool {
    self.food.contains(&point)
  }

  pub fn point_in_any_snake(&self, point: SnakePoint) -> bool {
    self.players.iter().any(|player| player.occupies(point))
  }

  pub fn active_count(&self) -> usize {
    self.players.iter().filter(|player| player.active).count()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
  pub player: usize,
  pub score: u32,
}

/// Outcome of a single tick. Only valid until the simulation is mutated again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Events {
  pub deaths: Vec<Death>,
  pub food_respawned: bool,
  pub game_over: bool,
}

impl Events {
  pub fn died_count(&self) -> usize {
    self.deaths.len()
  }

  pub fn died_players(&self) -> Vec<usize> {
    self.deaths.iter().map(|death| death.player).collect()
  }

  pub fn player_died(&self, player: usize) -> bool {
    self.deaths.iter().any(|death| death.player == player)
  }
}
