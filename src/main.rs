use anyhow::Context;
use clap::Parser;
use snake_tty::app::{self, AppOptions, DEFAULT_SCORE_FILE};
use snake_tty::config::GameConfig;
use snake_tty::persist::config_file;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake-tty", version, about = "Terminal snake with optional lobby play")]
struct Cli {
    /// Config file; written with defaults when missing.
    #[arg(default_value = "snake.cfg")]
    config: PathBuf,
    /// Fixed seed for the board.
    #[arg(long)]
    seed: Option<u32>,
    /// Draw a fresh seed instead of the configured one.
    #[arg(long, conflicts_with = "seed")]
    random_seed: bool,
    /// Number of local players.
    #[arg(long)]
    players: Option<i64>,
    /// ASCII glyphs instead of box drawing characters.
    #[arg(long)]
    ascii: bool,
    #[arg(long, default_value = DEFAULT_SCORE_FILE)]
    score_file: PathBuf,
    /// The terminal belongs to the game, so logs go here.
    #[arg(long, default_value = "snake.log")]
    log_file: PathBuf,
    /// Draw on this terminal device instead of stdout.
    #[arg(long)]
    tty: Option<PathBuf>,
}

fn init_tracing(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;
    let writer = std::sync::Mutex::new(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
    Ok(())
}

fn apply_overrides(config: &mut GameConfig, cli: &Cli) {
    if let Some(seed) = cli.seed {
        config.set_seed(seed);
    } else if cli.random_seed {
        config.set_seed(rand::random());
    }
    if let Some(players) = cli.players {
        config.set_num_players(players);
    }
    if cli.ascii {
        config.set_render_glyphs(snake_tty::config::RenderGlyphs::Ascii);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    let mut config = config_file::load_or_create(&cli.config);
    if config.has_unknown_keys() {
        tracing::warn!(path = %cli.config.display(), "config has unrecognized keys");
    }
    apply_overrides(&mut config, &cli);
    tracing::info!(
        seed = config.seed(),
        players = config.num_players(),
        width = config.board_width(),
        height = config.board_height(),
        "starting"
    );

    let options = AppOptions {
        score_file: cli.score_file.clone(),
        tty_path: cli.tty.clone(),
    };
    app::run(&config, &options).await
}
