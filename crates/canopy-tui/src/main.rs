mod app;
mod handler;
mod tui;
mod ui;

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use anyhow::{Result, anyhow};
use canopy_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = init_logging()?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "could not read config, using defaults");
            Config::new()
        }
    };

    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "dashboard exited with an error");
        eprintln!("Error: {} (log: {})", e, log_path.display());
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }

        app.poll_submission().await;
    }

    app.cancel_submission();
    Ok(())
}

/// The terminal belongs to the UI, so events go to `<data dir>/canopy/canopy.log`.
fn init_logging() -> Result<PathBuf> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("canopy");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("canopy.log");
    let file = File::options().create(true).append(true).open(&log_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    tracing::info!("canopy {} starting", env!("CARGO_PKG_VERSION"));
    Ok(log_path)
}
