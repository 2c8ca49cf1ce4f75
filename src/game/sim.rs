use super::collision;
use super::constants::{
  DEFAULT_PLAYER_COLORS, FOOD_MIN_ATTEMPTS, FOOD_RESPAWN_MAX, FOOD_RESPAWN_MIN, INITIAL_LENGTH,
  INITIAL_LIVES, MAX_PLAYERS, SPAWN_MARGIN, SPAWN_MAX_ATTEMPTS,
};
use super::direction::Direction;
use super::input::InputState;
use super::rng::XorShift32;
use super::types::{Death, Events, GameState, GameStatus, PlayerState, SnakePoint};
use thiserror::Error;


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
  #[error("board {width}x{height} cannot hold a snake")]
  InvalidDimensions { width: i32, height: i32 },
  #[error("player index {index} out of range ({count} players)")]
  PlayerIndex { index: usize, count: usize },
  #[error("invalid capacity for {0}")]
  Capacity(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerSetup {
  pub name: String,
  pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
  pub width: i32,
  pub height: i32,
  pub seed: u32,
  pub num_players: usize,
  pub max_players: usize,
  pub max_length: usize,
  pub max_food: usize,
  pub players: Vec<PlayerSetup>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
  state: GameState,
}

impl Simulation {
  pub fn new(config: &SimConfig) -> Result<Self, SimError> {
    let (width, height) = normalize_dimensions(config.width, config.height)?;
    if config.max_players == 0 || config.max_players > MAX_PLAYERS {
      return Err(SimError::Capacity("max_players"));
    }
    if config.num_players == 0 || config.num_players > config.max_players {
      return Err(SimError::Capacity("num_players"));
    }
    if config.max_length < INITIAL_LENGTH {
      return Err(SimError::Capacity("max_length"));
    }
    if config.max_food == 0 {
      return Err(SimError::Capacity("max_food"));
    }

    let players = (0..config.num_players)
      .map(|index| {
        let setup = config.players.get(index);
        let name = setup
          .map(|setup| setup.name.clone())
          .filter(|name| !name.is_empty())
          .unwrap_or_else(|| format!("Player{}", index + 1));
        let color = setup
          .map(|setup| setup.color)
          .filter(|color| *color != 0)
          .unwrap_or(DEFAULT_PLAYER_COLORS[index % DEFAULT_PLAYER_COLORS.len()]);
        PlayerState::new(config.max_length, name, color)
      })
      .collect();

    let mut sim = Self {
      state: GameState {
        width,
        height,
        rng: XorShift32::new(config.seed),
        status: GameStatus::Running,
        players,
        food: Vec::with_capacity(config.max_food),
        last_food_respawned: false,
        max_length: config.max_length,
        max_food: config.max_food,
        max_players: config.max_players,
      },
    };
    sim.reset();
    tracing::debug!(width, height, players = config.num_players, seed = config.seed, "simulation created");
    Ok(sim)
  }

  pub fn state(&self) -> &GameState {
    &self.state
  }

  #[cfg(test)]
  pub(crate) fn state_mut(&mut self) -> &mut GameState {
    &mut self.state
  }

  pub fn status(&self) -> GameStatus {
    self.state.status
  }

  /// Fresh round: every player respawns with full lives and food is re-placed.
  pub fn reset(&mut self) {
    for player in &mut self.state.players {
      player.clear_body();
      player.score = 0;
      player.score_at_death = 0;
      player.died_this_tick = false;
      player.active = false;
      player.needs_reset = false;
      player.eliminated = false;
      player.lives = INITIAL_LIVES;
    }
    self.state.food.clear();
    self.state.status = GameStatus::Running;

    for index in 0..self.state.players.len() {
      self.spawn_player(index);
    }
    if self.state.active_count() == 0 {
      tracing::warn!(width = self.state.width, height = self.state.height, "no player could be placed");
      self.state.status = GameStatus::GameOver;
    }
    self.respawn_food();
    self.state.last_food_respawned = false;
  }

  pub fn toggle_pause(&mut self) {
    self.state.status = match self.state.status {
      GameStatus::Running => GameStatus::Paused,
      GameStatus::Paused => GameStatus::Running,
      GameStatus::GameOver => GameStatus::GameOver,
    };
  }

  /// Records a direction request for the next tick; the last request wins.
  pub fn enqueue_input(&mut self, player_index: usize, input: &InputState) -> Result<(), SimError> {
    let count = self.state.players.len();
    let Some(player) = self.state.players.get_mut(player_index) else {
      return Err(SimError::PlayerIndex {
        index: player_index,
        count,
      });
    };
    if !player.active {
      return Ok(());
    }
    if input.move_up {
      player.queued_dir = Direction::Up;
    }
    if input.move_down {
      player.queued_dir = Direction::Down;
    }
    if input.move_left {
      player.queued_dir = Direction::Left;
    }
    if input.move_right {
      player.queued_dir = Direction::Right;
    }
    if input.turn_left {
      player.queued_dir = player.current_dir.turn_left();
    }
    if input.turn_right {
      player.queued_dir = player.current_dir.turn_right();
    }
    Ok(())
  }

  pub fn step(&mut self) -> Events {
    let mut events = Events::default();
    self.state.last_food_respawned = false;
    if self.state.status != GameStatus::Running {
      return events;
    }

    for player in &mut self.state.players {
      player.needs_reset = false;
      player.died_this_tick = false;
      player.score_at_death = 0;
    }

    self.snapshot_previous_positions();
    self.apply_queued_turns();

    let marked = collision::detect(&self.state);
    for (player, marked) in self.state.players.iter_mut().zip(marked) {
      player.needs_reset = marked;
    }

    let eaten = self.advance_bodies();
    if eaten && self.state.food.len() < self.state.max_food {
      self.respawn_food();
    }

    self.resolve_deaths(&mut events);

    if self.state.status == GameStatus::Running && self.state.active_count() == 0 {
      self.state.status = GameStatus::GameOver;
    }

    events.food_respawned = self.state.last_food_respawned;
    events.game_over = self.state.status == GameStatus::GameOver;
    events
  }

  fn snapshot_previous_positions(&mut self) {
    for player in &mut self.state.players {
      if !player.active {
        continue;
      }
      let Some(head) = player.head() else { continue };
      player.prev_head = head.center();
      player.prev_segments.clear();
      player
        .prev_segments
        .extend(player.body.iter().map(|segment| segment.center()));
    }
  }

  fn apply_queued_turns(&mut self) {
    for player in &mut self.state.players {
      if !player.active || player.body.is_empty() {
        continue;
      }
      let reversing = player.queued_dir == player.current_dir.opposite() && player.body.len() >= 2;
      if player.queued_dir != player.current_dir && !reversing {
        player.current_dir = player.queued_dir;
      }
    }
  }

  fn advance_bodies(&mut self) -> bool {
    let state = &mut self.state;
    let max_length = state.max_length;
    let mut eaten = false;
    for player in state.players.iter_mut() {
      if !player.active || player.needs_reset {
        continue;
      }
      let Some(head) = player.head() else { continue };
      let next_head = player.current_dir.step(head);
      let food_index = state.food.iter().position(|food| *food == next_head);
      if let Some(food_index) = food_index {
        state.food.remove(food_index);
        eaten = true;
      }
      move_player(player, next_head, food_index.is_some(), max_length);
      if food_index.is_some() {
        player.score = player.score.saturating_add(1);
      }
    }
    eaten
  }

  fn resolve_deaths(&mut self, events: &mut Events) {
    for index in 0..self.state.players.len() {
      let player = &mut self.state.players[index];
      if !player.active || !player.needs_reset {
        continue;
      }
      player.died_this_tick = true;
      player.score_at_death = player.score;
      events.deaths.push(Death {
        player: index,
        score: player.score,
      });
      player.score = 0;
      player.needs_reset = false;
      player.lives = player.lives.saturating_sub(1);
      tracing::debug!(player = index, score = player.score_at_death, lives = player.lives, "player died");

      if player.lives == 0 {
        player.eliminated = true;
        player.active = false;
        player.clear_body();
        tracing::debug!(player = index, "player eliminated");
        continue;
      }

      if !self.spawn_player(index) {
        self.state.status = GameStatus::GameOver;
      }
    }
  }

  /// Places player `index` with a two-cell body facing away from the nearest
  /// wall. Returns false when no free spot was found.
  fn spawn_player(&mut self, index: usize) -> bool {
    let width = self.state.width;
    let height = self.state.height;
    let (x_lo, x_hi) = spawn_span(width);
    let (y_lo, y_hi) = spawn_span(height);

    for _ in 0..SPAWN_MAX_ATTEMPTS {
      let head = SnakePoint::new(self.state.rng.range(x_lo, x_hi), self.state.rng.range(y_lo, y_hi));
      let direction = roomiest_direction(head, width, height);
      let tail = direction.opposite().step(head);
      if !self.state.in_bounds(head) || !self.state.in_bounds(tail) {
        continue;
      }
      if self.cell_blocked(index, head) || self.cell_blocked(index, tail) {
        continue;
      }

      let player = &mut self.state.players[index];
      player.clear_body();
      player.body.push(head);
      player.body.push(tail);
      player.prev_head = head.center();
      player.prev_segments.push(head.center());
      player.prev_segments.push(tail.center());
      player.current_dir = direction;
      player.queued_dir = direction;
      player.active = true;
      player.needs_reset = false;
      return true;
    }

    let player = &mut self.state.players[index];
    player.active = false;
    player.clear_body();
    tracing::warn!(player = index, attempts = SPAWN_MAX_ATTEMPTS, "no free cell to spawn player");
    false
  }

  fn cell_blocked(&self, index: usize, cell: SnakePoint) -> bool {
    if self.state.is_food(cell) {
      return true;
    }
    self
      .state
      .players
      .iter()
      .enumerate()
      .any(|(other, player)| other != index && player.occupies(cell))
  }

  fn respawn_food(&mut self) {
    let state = &mut self.state;
    let wanted = state.rng.range(FOOD_RESPAWN_MIN, FOOD_RESPAWN_MAX);
    let attempts = (state.width as usize * state.height as usize).max(FOOD_MIN_ATTEMPTS);
    for _ in 0..wanted {
      if state.food.len() >= state.max_food {
        break;
      }
      for _ in 0..attempts {
        let cell = SnakePoint::new(
          state.rng.range(0, state.width - 1),
          state.rng.range(0, state.height - 1),
        );
        if !state.point_in_any_snake(cell) && !state.is_food(cell) {
          state.food.push(cell);
          break;
        }
      }
    }
    state.last_food_respawned = true;
  }
}

fn normalize_dimensions(width: i32, height: i32) -> Result<(i32, i32), SimError> {
  let invalid = SimError::InvalidDimensions { width, height };
  if width <= 0 || height <= 0 || (width < 2 && height < 2) {
    return Err(invalid);
  }
  Ok((width.max(2), height.max(2)))
}

fn spawn_span(extent: i32) -> (i32, i32) {
  if extent > SPAWN_MARGIN * 2 {
    (SPAWN_MARGIN, extent - 1 - SPAWN_MARGIN)
  } else {
    (0, extent - 1)
  }
}

fn roomiest_direction(head: SnakePoint, width: i32, height: i32) -> Direction {
  let candidates = [
    (Direction::Left, head.x),
    (Direction::Right, width - 1 - head.x),
    (Direction::Up, head.y),
    (Direction::Down, height - 1 - head.y),
  ];
  let mut best = candidates[0];
  for candidate in &candidates[1..] {
    if candidate.1 > best.1 {
      best = *candidate;
    }
  }
  best.0
}

fn move_player(player: &mut PlayerState, next_head: SnakePoint, grow: bool, max_length: usize) {
  let grows = grow && player.body.len() < max_length;
  let old_tail = player.tail();
  if !grows {
    player.body.pop();
  }
  player.body.insert(0, next_head);
  if grows {
    if let Some(tail) = old_tail {
      player.prev_segments.push(tail.center());
    }
  }
}
