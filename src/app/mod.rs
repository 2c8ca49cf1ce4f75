pub mod driver;
pub mod link;

use crate::config::{GameConfig, RenderMode};
use crate::game::sim::Simulation;
use crate::persist::scores::ScoreFile;
use crate::render::Renderer;
use crate::tty::{terminal, Size, Tty};
use anyhow::Context;
use driver::Driver;
use link::LobbyLink;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCORE_FILE: &str = ".snake_scores";

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub score_file: PathBuf,
    /// Terminal device to draw on; stdout when unset.
    pub tty_path: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            score_file: PathBuf::from(DEFAULT_SCORE_FILE),
            tty_path: None,
        }
    }
}

/// Builds every component from `config` and runs the game until the player
/// quits. The terminal is restored before this returns, on error too.
pub async fn run(config: &GameConfig, options: &AppOptions) -> anyhow::Result<()> {
    let sim = Simulation::new(&config.sim_config()).context("create simulation")?;
    if config.render_mode() == RenderMode::ThreeD {
        tracing::info!("3d view unavailable in the terminal build, drawing 2d");
    }

    let link = if config.mp_enabled() {
        let name = config.player(0).map(|player| player.name()).unwrap_or_default();
        match LobbyLink::start(config, name).await {
            Ok(link) => Some(link),
            Err(error) => {
                tracing::warn!(?error, "lobby unavailable, playing offline");
                None
            }
        }
    } else {
        None
    };

    let min = Size::new(config.screen_width(), config.screen_height());
    let tty = Tty::open(options.tty_path.as_deref(), min).context("open terminal")?;
    let watcher = terminal::spawn_resize_watcher(tty.resize_flag()).context("watch terminal size")?;

    let renderer = Renderer::new(
        config.render_glyphs(),
        config.key_quit(),
        config.key_restart(),
        config.key_pause(),
    );
    let tick = Duration::from_millis(u64::from(config.tick_rate_ms()));
    let mut driver = Driver::new(
        tty,
        sim,
        renderer,
        config.key_bindings(),
        ScoreFile::new(&options.score_file),
        tick,
    );
    if let Some(link) = link {
        driver.set_link(link);
    }

    let result = driver.run(terminal::spawn_stdin_reader()).await;
    watcher.abort();
    drop(driver);
    result.context("run game loop")
}
