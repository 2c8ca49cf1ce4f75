use crate::config::{BOARD_MAX, MAX_FOOD_MAX, MAX_LENGTH_MAX};
use crate::game::constants::MAX_PLAYERS;
use crate::game::input::InputState;
use crate::game::types::{GameState, GameStatus, SnakePoint};
use thiserror::Error;

pub const INPUT_QUIT: u8 = 0x01;
pub const INPUT_RESTART: u8 = 0x02;
pub const INPUT_PAUSE: u8 = 0x04;
pub const INPUT_UP: u8 = 0x10;
pub const INPUT_DOWN: u8 = 0x20;
pub const INPUT_LEFT: u8 = 0x40;
pub const INPUT_RIGHT: u8 = 0x80;

pub const STATE_HEADER_LEN: usize = 24;
const PAIR_LEN: usize = 8;

/// Largest length-prefixed frame accepted from a peer.
pub const MAX_FRAME_LEN: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
  Players,
  Food,
  Length,
  Dimension,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("buffer too small: {actual} bytes, need {required}")]
  BufferTooSmall { actual: usize, required: usize },
  #[error("invalid board dimensions {width}x{height}")]
  InvalidDimensions { width: i32, height: i32 },
  #[error("negative {kind:?} count {value}")]
  NegativeCount { kind: LimitKind, value: i32 },
  #[error("{kind:?} limit {limit} exceeded: {actual}")]
  LimitsExceeded {
    kind: LimitKind,
    limit: usize,
    actual: usize,
  },
  #[error("declared sizes overflow")]
  SizeOverflow,
  #[error("unknown status {0}")]
  InvalidStatus(u32),
  #[error("food at ({x},{y}) outside the board")]
  FoodOutOfBounds { x: i32, y: i32 },
  #[error("food at ({x},{y}) listed twice")]
  DuplicateFood { x: i32, y: i32 },
  #[error("frame length {0} exceeds maximum")]
  FrameTooLarge(usize),
  #[error("empty frame")]
  EmptyFrame,
}

/// Caps applied to peer-declared counts before anything is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
  pub max_players: usize,
  pub max_food: usize,
  pub max_length: usize,
  pub max_dimension: i32,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_players: MAX_PLAYERS,
      max_food: MAX_FOOD_MAX,
      max_length: MAX_LENGTH_MAX,
      max_dimension: BOARD_MAX,
    }
  }
}

pub fn encode_input(input: &InputState) -> u8 {
  let mut flags = 0;
  if input.quit {
    flags |= INPUT_QUIT;
  }
  if input.restart {
    flags |= INPUT_RESTART;
  }
  if input.pause_toggle {
    flags |= INPUT_PAUSE;
  }
  if input.move_up {
    flags |= INPUT_UP;
  }
  if input.move_down {
    flags |= INPUT_DOWN;
  }
  if input.move_left {
    flags |= INPUT_LEFT;
  }
  if input.move_right {
    flags |= INPUT_RIGHT;
  }
  flags
}

pub fn decode_input(flags: u8) -> InputState {
  InputState {
    quit: flags & INPUT_QUIT != 0,
    restart: flags & INPUT_RESTART != 0,
    pause_toggle: flags & INPUT_PAUSE != 0,
    move_up: flags & INPUT_UP != 0,
    move_down: flags & INPUT_DOWN != 0,
    move_left: flags & INPUT_LEFT != 0,
    move_right: flags & INPUT_RIGHT != 0,
    turn_left: false,
    turn_right: false,
    any_key: flags != 0,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSummary {
  pub score: u32,
  pub length: u32,
}

/// The serialized subset of a `GameState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFrame {
  pub width: i32,
  pub height: i32,
  pub rng_state: u32,
  pub status: GameStatus,
  pub food: Vec<SnakePoint>,
  pub players: Vec<PlayerSummary>,
}

impl StateFrame {
  pub fn from_state(state: &GameState) -> Self {
    Self {
      width: state.width,
      height: state.height,
      rng_state: state.rng_state(),
      status: state.status,
      food: state.food.clone(),
      players: state
        .players
        .iter()
        .map(|player| PlayerSummary {
          score: player.score,
          length: player.length() as u32,
        })
        .collect(),
    }
  }

  pub fn encoded_len(&self) -> usize {
    STATE_HEADER_LEN + (self.food.len() + self.players.len()) * PAIR_LEN
  }

  pub fn encode(&self) -> Vec<u8> {
    let mut encoder = Encoder::with_capacity(self.encoded_len());
    encoder.write_i32(self.width);
    encoder.write_i32(self.height);
    encoder.write_u32(self.rng_state);
    encoder.write_u32(self.status.to_wire());
    encoder.write_u32(self.players.len() as u32);
    encoder.write_u32(self.food.len() as u32);
    for food in &self.food {
      encoder.write_i32(food.x);
      encoder.write_i32(food.y);
    }
    for player in &self.players {
      encoder.write_u32(player.score);
      encoder.write_u32(player.length);
    }
    encoder.into_vec()
  }
}

pub fn encode_state(state: &GameState) -> Vec<u8> {
  StateFrame::from_state(state).encode()
}

fn checked_count(raw: u32, kind: LimitKind, limit: usize) -> Result<usize, DecodeError> {
  let value = raw as i32;
  if value < 0 {
    return Err(DecodeError::NegativeCount { kind, value });
  }
  let actual = value as usize;
  if actual > limit {
    return Err(DecodeError::LimitsExceeded { kind, limit, actual });
  }
  Ok(actual)
}

/// Decodes a state frame from an untrusted peer. Counts are validated
/// against `limits` and the total size before any allocation.
pub fn decode_state(data: &[u8], limits: &Limits) -> Result<StateFrame, DecodeError> {
  if data.len() < STATE_HEADER_LEN {
    return Err(DecodeError::BufferTooSmall {
      actual: data.len(),
      required: STATE_HEADER_LEN,
    });
  }
  let mut reader = Reader::new(data);
  let width = reader.read_i32()?;
  let height = reader.read_i32()?;
  let rng_state = reader.read_u32()?;
  let status_raw = reader.read_u32()?;
  let players_raw = reader.read_u32()?;
  let food_raw = reader.read_u32()?;

  if width <= 0 || height <= 0 {
    return Err(DecodeError::InvalidDimensions { width, height });
  }
  let largest = width.max(height);
  if largest > limits.max_dimension {
    return Err(DecodeError::LimitsExceeded {
      kind: LimitKind::Dimension,
      limit: limits.max_dimension.max(0) as usize,
      actual: largest as usize,
    });
  }
  let status = GameStatus::from_wire(status_raw).ok_or(DecodeError::InvalidStatus(status_raw))?;
  let num_players = checked_count(players_raw, LimitKind::Players, limits.max_players)?;
  let food_count = checked_count(food_raw, LimitKind::Food, limits.max_food)?;

  let required = food_count
    .checked_add(num_players)
    .and_then(|pairs| pairs.checked_mul(PAIR_LEN))
    .and_then(|body| body.checked_add(STATE_HEADER_LEN))
    .ok_or(DecodeError::SizeOverflow)?;
  if data.len() < required {
    return Err(DecodeError::BufferTooSmall {
      actual: data.len(),
      required,
    });
  }

  let mut food: Vec<SnakePoint> = Vec::with_capacity(food_count);
  for _ in 0..food_count {
    let point = SnakePoint::new(reader.read_i32()?, reader.read_i32()?);
    if point.x < 0 || point.y < 0 || point.x >= width || point.y >= height {
      return Err(DecodeError::FoodOutOfBounds {
        x: point.x,
        y: point.y,
      });
    }
    if food.contains(&point) {
      return Err(DecodeError::DuplicateFood {
        x: point.x,
        y: point.y,
      });
    }
    food.push(point);
  }

  let mut players = Vec::with_capacity(num_players);
  for _ in 0..num_players {
    let score = reader.read_u32()?;
    let length_raw = reader.read_u32()?;
    let length = checked_count(length_raw, LimitKind::Length, limits.max_length)?;
    players.push(PlayerSummary {
      score,
      length: length as u32,
    });
  }

  Ok(StateFrame {
    width,
    height,
    rng_state,
    status,
    food,
    players,
  })
}

pub struct Encoder {
  buffer: Vec<u8>,
}

impl Encoder {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buffer: Vec::with_capacity(capacity),
    }
  }

  pub fn into_vec(self) -> Vec<u8> {
    self.buffer
  }

  pub fn write_u8(&mut self, value: u8) {
    self.buffer.push(value);
  }

  pub fn write_i32(&mut self, value: i32) {
    self.buffer.extend_from_slice(&value.to_be_bytes());
  }

  pub fn write_u32(&mut self, value: u32) {
    self.buffer.extend_from_slice(&value.to_be_bytes());
  }
}

struct Reader<'a> {
  data: &'a [u8],
  offset: usize,
}

impl<'a> Reader<'a> {
  fn new(data: &'a [u8]) -> Self {
    Self { data, offset: 0 }
  }

  fn read_i32(&mut self) -> Result<i32, DecodeError> {
    Ok(i32::from_be_bytes(self.read_bytes::<4>()?))
  }

  fn read_u32(&mut self) -> Result<u32, DecodeError> {
    Ok(u32::from_be_bytes(self.read_bytes::<4>()?))
  }

  fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
    let end = self.offset.checked_add(N).ok_or(DecodeError::SizeOverflow)?;
    let Some(slice) = self.data.get(self.offset..end) else {
      return Err(DecodeError::BufferTooSmall {
        actual: self.data.len(),
        required: end,
      });
    };
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    self.offset = end;
    Ok(out)
  }
}
