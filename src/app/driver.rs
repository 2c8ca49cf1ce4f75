use super::link::LobbyLink;
use crate::game::input::{self, InputState, KeyBindings};
use crate::game::sim::Simulation;
use crate::game::types::{Events, GameStatus, Lifecycle};
use crate::persist::scores::{AppendOutcome, HighScore, ScoreFile};
use crate::render::{Hud, Layout, Overlay, Renderer};
use crate::shared::names::score_name;
use crate::tty::{Size, Tty, TtyError};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{Instant, MissedTickBehavior};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Border plus one cell of slack on every side of the board.
const BOARD_MARGIN: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// Waiting for any key after player 0 died in a single-player game.
    Dead { score: u32 },
    GameOver,
    /// Terminal below the minimum; `resume` re-starts a game this phase paused.
    TooSmall { resume: bool },
    Quit,
}

/// What one frame did, for callers that forward ticks elsewhere.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub ticked: bool,
    pub events: Events,
}

pub struct Driver<W: Write> {
    tty: Tty<W>,
    sim: Simulation,
    renderer: Renderer,
    bindings: KeyBindings,
    scores: ScoreFile,
    high_scores: Vec<HighScore>,
    phase: Phase,
    tick_interval: Duration,
    link: Option<LobbyLink>,
}

impl<W: Write> Driver<W> {
    pub fn new(
        tty: Tty<W>,
        sim: Simulation,
        renderer: Renderer,
        bindings: KeyBindings,
        scores: ScoreFile,
        tick_interval: Duration,
    ) -> Self {
        let high_scores = load_high_scores(&scores);
        let mut driver = Self {
            tty,
            sim,
            renderer,
            bindings,
            scores,
            high_scores,
            phase: Phase::Playing,
            tick_interval,
            link: None,
        };
        driver.tty.force_redraw();
        driver
    }

    pub fn set_link(&mut self, link: LobbyLink) {
        self.link = Some(link);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn tty(&self) -> &Tty<W> {
        &self.tty
    }

    pub fn tty_mut(&mut self) -> &mut Tty<W> {
        &mut self.tty
    }

    pub fn high_scores(&self) -> &[HighScore] {
        &self.high_scores
    }

    /// One outer frame: resize check, input, an optional simulation tick,
    /// then a render and flush.
    pub fn frame(&mut self, bytes: &[u8], tick_due: bool) -> Result<FrameReport, TtyError> {
        let mut report = FrameReport::default();
        if self.tty.check_resize() {
            self.tty.force_redraw();
        }

        let states = input::decode(bytes, &self.bindings, self.sim.state().num_players());
        let global = states.first().copied().unwrap_or_default();
        if global.quit {
            tracing::info!("quit requested");
            self.phase = Phase::Quit;
            return Ok(report);
        }

        if !self.terminal_fits() {
            if !matches!(self.phase, Phase::TooSmall { .. }) {
                let resume = self.sim.status() == GameStatus::Running;
                if resume {
                    self.sim.toggle_pause();
                }
                let size = self.tty.size();
                tracing::info!(width = size.width, height = size.height, "terminal too small, pausing");
                self.phase = Phase::TooSmall { resume };
            }
            let need = self.required_size();
            self.renderer
                .draw_overlay(&mut self.tty, &Overlay::TooSmall { need }, &self.high_scores);
            self.tty.flush()?;
            return Ok(report);
        }

        match self.phase {
            Phase::TooSmall { resume } => {
                if resume && self.sim.status() == GameStatus::Paused {
                    self.sim.toggle_pause();
                }
                tracing::info!("terminal large enough, resuming");
                self.phase = Phase::Playing;
                self.tty.force_redraw();
            }
            Phase::Dead { .. } => {
                if global.any_key {
                    self.restart();
                }
            }
            Phase::GameOver => {
                if global.restart {
                    self.restart();
                }
            }
            Phase::Playing => {
                if global.restart {
                    self.restart();
                } else if global.pause_toggle {
                    self.sim.toggle_pause();
                }
                self.enqueue(&states);
                if tick_due {
                    report.events = self.sim.step();
                    report.ticked = true;
                    self.handle_events(&report.events);
                }
            }
            Phase::Quit => return Ok(report),
        }

        self.render()?;
        Ok(report)
    }

    /// Records the live score of player 0, if any. Called once on exit.
    pub fn finish(&mut self) {
        let Some(player) = self.sim.state().players.first() else {
            return;
        };
        if player.lifecycle() == Lifecycle::Active && player.score > 0 {
            let name = player.name.clone();
            let score = player.score;
            self.record_score(&name, score);
        }
    }

    /// Frame loop: drains stdin bytes, ticks the simulation on its own
    /// cadence and exchanges snapshots with the lobby when linked.
    pub async fn run(&mut self, mut input: mpsc::Receiver<Vec<u8>>) -> Result<(), TtyError> {
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_tick = Instant::now() + self.tick_interval;

        loop {
            frames.tick().await;

            let mut bytes = Vec::new();
            let mut closed = false;
            loop {
                match input.try_recv() {
                    Ok(chunk) => bytes.extend_from_slice(&chunk),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }

            let now = Instant::now();
            let tick_due = now >= next_tick;
            if tick_due {
                next_tick = now + self.tick_interval;
            }

            let report = self.frame(&bytes, tick_due)?;
            if report.ticked {
                self.exchange_with_lobby().await;
            }

            if closed {
                tracing::info!("input closed");
                self.phase = Phase::Quit;
            }
            if self.phase == Phase::Quit {
                break;
            }
        }

        self.finish();
        if let Some(mut link) = self.link.take() {
            link.stop().await;
        }
        Ok(())
    }

    async fn exchange_with_lobby(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if let Err(error) = link.publish(self.sim.state()).await {
            tracing::warn!(?error, "lobby publish failed, continuing offline");
            link.stop().await;
            self.link = None;
            return;
        }
        link.drain();
    }

    fn enqueue(&mut self, states: &[InputState]) {
        for (player, state) in states.iter().enumerate() {
            if let Err(error) = self.sim.enqueue_input(player, state) {
                tracing::debug!(?error, player, "input dropped");
            }
        }
    }

    fn handle_events(&mut self, events: &Events) {
        for death in &events.deaths {
            tracing::debug!(player = death.player, score = death.score, "player died");
            if death.score > 0 {
                let name = self
                    .sim
                    .state()
                    .players
                    .get(death.player)
                    .map(|player| player.name.clone())
                    .unwrap_or_default();
                self.record_score(&name, death.score);
            }
        }

        if events.game_over || self.sim.status() == GameStatus::GameOver {
            tracing::info!("game over");
            self.phase = Phase::GameOver;
        } else if self.sim.state().num_players() == 1 && events.player_died(0) {
            let score = events
                .deaths
                .iter()
                .find(|death| death.player == 0)
                .map_or(0, |death| death.score);
            self.phase = Phase::Dead { score };
        }
    }

    fn record_score(&mut self, name: &str, score: u32) {
        let name = score_name(name);
        match self.scores.append(&name, score) {
            Ok(AppendOutcome::Stored) => tracing::info!(name = %name, score, "high score stored"),
            Ok(AppendOutcome::Rejected) => tracing::debug!(name = %name, score, "score below table"),
            Err(error) => tracing::warn!(?error, "could not store score"),
        }
        self.high_scores = load_high_scores(&self.scores);
    }

    fn restart(&mut self) {
        tracing::info!("game reset");
        self.sim.reset();
        self.phase = Phase::Playing;
        self.tty.force_redraw();
    }

    fn layout(&self) -> Layout {
        let state = self.sim.state();
        Layout::for_board(self.tty.size(), state.width, state.height)
    }

    fn terminal_fits(&self) -> bool {
        self.tty.size_valid() && self.layout().fits(self.tty.size())
    }

    fn required_size(&self) -> Size {
        let state = self.sim.state();
        let min = self.tty.min_size();
        let width = (state.width + BOARD_MARGIN).clamp(0, u16::MAX as i32) as u16;
        let height = (state.height + BOARD_MARGIN).clamp(0, u16::MAX as i32) as u16;
        Size::new(min.width.max(width), min.height.max(height))
    }

    fn render(&mut self) -> Result<(), TtyError> {
        let session = self.link.as_ref().and_then(LobbyLink::session);
        let hud = Hud {
            high_scores: &self.high_scores,
            remote: self.link.as_ref().and_then(LobbyLink::remote),
            session: session.as_deref(),
        };
        self.renderer.draw(&mut self.tty, self.sim.state(), &hud);
        match self.phase {
            Phase::Dead { score } => {
                self.renderer
                    .draw_overlay(&mut self.tty, &Overlay::Death { score }, &self.high_scores)
            }
            Phase::GameOver => {
                self.renderer
                    .draw_overlay(&mut self.tty, &Overlay::GameOver, &self.high_scores)
            }
            _ => {}
        }
        self.tty.flush()?;
        Ok(())
    }
}

fn load_high_scores(scores: &ScoreFile) -> Vec<HighScore> {
    scores.load().unwrap_or_else(|error| {
        tracing::warn!(?error, "could not read score file");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderGlyphs;
    use crate::game::input::KEY_ESCAPE;
    use crate::game::sim::SimConfig;
    use crate::game::types::SnakePoint;
    use crate::persist::test_support::TempDir;

    fn make_driver(dir: &TempDir, num_players: usize, size: Size) -> Driver<Vec<u8>> {
        let sim = Simulation::new(&SimConfig {
            width: 10,
            height: 10,
            seed: 42,
            num_players,
            max_players: num_players,
            max_length: 64,
            max_food: 3,
            players: Vec::new(),
        })
        .expect("sim");
        let tty = Tty::with_writer(Vec::new(), size, Size::new(40, 16)).expect("tty");
        let bindings = KeyBindings::default();
        let renderer = Renderer::new(RenderGlyphs::Ascii, bindings.quit, bindings.restart, bindings.pause);
        let scores = ScoreFile::new(dir.file("scores"));
        Driver::new(tty, sim, renderer, bindings, scores, Duration::from_millis(100))
    }

    /// Points player 0 at the nearest wall and ticks until it dies.
    fn crash_player_zero(driver: &mut Driver<Vec<u8>>) -> Events {
        for _ in 0..20 {
            let report = driver.frame(&[], true).expect("frame");
            if report.events.player_died(0) {
                return report.events;
            }
        }
        panic!("player 0 never died");
    }

    fn head(driver: &Driver<Vec<u8>>) -> SnakePoint {
        driver.sim().state().players[0].head().expect("head")
    }

    #[test]
    fn frame_renders_and_ticks_only_when_due() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        let start = head(&driver);

        let report = driver.frame(&[], false).expect("frame");
        assert!(!report.ticked);
        assert_eq!(head(&driver), start);
        assert!(!driver.tty().get_ref().is_empty());

        let report = driver.frame(&[], true).expect("frame");
        assert!(report.ticked);
        assert_ne!(head(&driver), start);
        assert_eq!(driver.phase(), Phase::Playing);
    }

    #[test]
    fn quit_key_ends_the_loop() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        driver.frame(&[KEY_ESCAPE], false).expect("frame");
        assert_eq!(driver.phase(), Phase::Quit);
    }

    #[test]
    fn pause_key_freezes_ticks() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        driver.frame(b"p", false).expect("frame");
        assert_eq!(driver.sim().status(), GameStatus::Paused);
        let start = head(&driver);
        let report = driver.frame(&[], true).expect("frame");
        assert!(report.events.deaths.is_empty());
        assert_eq!(head(&driver), start);
        driver.frame(b"P", false).expect("frame");
        assert_eq!(driver.sim().status(), GameStatus::Running);
    }

    #[test]
    fn single_player_death_waits_for_a_key() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        let events = crash_player_zero(&mut driver);
        assert!(events.player_died(0));
        assert!(matches!(driver.phase(), Phase::Dead { .. }));

        let frozen = driver.sim().state().clone();
        driver.frame(&[], true).expect("frame");
        assert_eq!(driver.sim().state(), &frozen);

        driver.frame(b"x", false).expect("frame");
        assert_eq!(driver.phase(), Phase::Playing);
        assert_eq!(driver.sim().state().players[0].score, 0);
    }

    #[test]
    fn scoring_deaths_are_recorded() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        let head = head(&driver);
        let dir_now = driver.sim().state().players[0].current_dir;
        let (dx, dy) = dir_now.delta();
        {
            // Put food directly ahead so the snake scores before crashing.
            let state = driver.sim.state_mut();
            state.food.clear();
            state.food.push(SnakePoint::new(head.x + dx, head.y + dy));
        }
        let events = crash_player_zero(&mut driver);
        let death = events.deaths.iter().find(|death| death.player == 0).expect("death");
        assert!(death.score > 0);
        assert_eq!(driver.high_scores().len(), 1);
        assert_eq!(driver.high_scores()[0].score, death.score);
        assert_eq!(driver.high_scores()[0].name, "Player1");
    }

    #[test]
    fn too_small_terminal_pauses_and_resumes() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        driver.tty_mut().set_test_size(30, 10);
        driver.tty_mut().simulate_winch();
        let start = head(&driver);
        driver.frame(&[], true).expect("frame");
        assert_eq!(driver.phase(), Phase::TooSmall { resume: true });
        assert_eq!(driver.sim().status(), GameStatus::Paused);
        assert_eq!(head(&driver), start);

        driver.tty_mut().set_test_size(80, 24);
        driver.tty_mut().simulate_winch();
        driver.frame(&[], false).expect("frame");
        assert_eq!(driver.phase(), Phase::Playing);
        assert_eq!(driver.sim().status(), GameStatus::Running);
    }

    #[test]
    fn too_small_keeps_a_user_pause() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        driver.frame(b"p", false).expect("frame");
        driver.tty_mut().set_test_size(30, 10);
        driver.tty_mut().simulate_winch();
        driver.frame(&[], false).expect("frame");
        assert_eq!(driver.phase(), Phase::TooSmall { resume: false });

        driver.tty_mut().set_test_size(80, 24);
        driver.tty_mut().simulate_winch();
        driver.frame(&[], false).expect("frame");
        assert_eq!(driver.sim().status(), GameStatus::Paused);
    }

    #[test]
    fn game_over_restarts_on_restart_key() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 2, Size::new(80, 24));
        for _ in 0..400 {
            driver.frame(&[], true).expect("frame");
            if driver.phase() == Phase::GameOver {
                break;
            }
        }
        assert_eq!(driver.phase(), Phase::GameOver);
        assert_eq!(driver.sim().status(), GameStatus::GameOver);

        driver.frame(b"x", false).expect("frame");
        assert_eq!(driver.phase(), Phase::GameOver);
        driver.frame(b"r", false).expect("frame");
        assert_eq!(driver.phase(), Phase::Playing);
        assert_eq!(driver.sim().status(), GameStatus::Running);
    }

    #[test]
    fn finish_records_live_score() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        driver.sim.state_mut().players[0].score = 7;
        driver.finish();
        assert_eq!(driver.high_scores()[0].score, 7);
    }

    #[tokio::test]
    async fn run_stops_when_input_closes() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 1, Size::new(80, 24));
        let (tx, rx) = mpsc::channel(4);
        tx.send(vec![b'p']).await.expect("send");
        drop(tx);
        driver.run(rx).await.expect("run");
        assert_eq!(driver.phase(), Phase::Quit);
        assert_eq!(driver.sim().status(), GameStatus::Paused);
    }

    #[test]
    fn multiplayer_death_does_not_block() {
        let dir = TempDir::new();
        let mut driver = make_driver(&dir, 2, Size::new(80, 24));
        crash_player_zero(&mut driver);
        assert_ne!(driver.phase(), Phase::Dead { score: 0 });
        assert!(matches!(driver.phase(), Phase::Playing | Phase::GameOver));
    }
}
