// Re-export library modules so binary-internal modules can use crate::error::
pub(crate) use guided_study::error;

mod app;
mod config;
mod keys;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use config::AppConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn config_dir() -> PathBuf {
    AppConfig::config_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Log to a file next to the config; the terminal belongs to the UI.
fn init_tracing(dir: &Path, level: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("guided-study.log"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(filter),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = config_dir();
    let path = dir.join("config.toml");

    if !path.exists() {
        AppConfig::write_default(&path)?;
        eprintln!(
            "Created default config at: {}\nPoint [source] at a document, then run again.",
            path.display()
        );
        return Ok(());
    }

    let config = match AppConfig::load_from_path(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            eprintln!("Fix the config file or delete it to regenerate defaults.");
            return Ok(());
        }
    };

    if let Err(e) = init_tracing(&dir, &config.log_level) {
        eprintln!("Logging disabled: {}", e);
    }
    info!(config = %path.display(), "Starting");

    let mut terminal = ratatui::init();

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let result = app::run(&config, &mut terminal).await;

    ratatui::restore();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}
