//! streakcards - flashcard review in the terminal
//!
//! Answer "Know" or "Don't Know", build a streak, earn tokens that save it,
//! and unlock badges along the way. Missed cards come back first next deck.

mod catalog;
mod config;
mod engine;
mod models;
mod storage;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use engine::CategoryFilter;
use storage::{JsonFileStore, SessionStore};
use ui::App;

const LOG_FILE: &str = "streakcards.log";

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "streakcards")]
#[command(author, version, about = "Flashcard review with streaks, tokens and badges", long_about = None)]
struct Args {
    /// Directory holding review state (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Category to study first: a category id, or "all"
    #[arg(short, long, default_value = "all")]
    category: String,

    /// Import `question,answer` lines from a CSV file as custom cards
    #[arg(short, long)]
    import: Option<PathBuf>,

    /// Category id for imported cards
    #[arg(long, default_value = "1", requires = "import")]
    import_category: String,

    /// Write a backup of all review state to this file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Restore review state from a backup file
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Delete all review state and start over
    #[arg(long)]
    reset: bool,

    /// Turn the per-card countdown off (saved for later runs)
    #[arg(long)]
    no_timer: bool,
}

impl Args {
    fn is_batch(&self) -> bool {
        self.import.is_some() || self.export.is_some() || self.restore.is_some() || self.reset
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}; using default config", e);
        Config::default()
    });

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(JsonFileStore::default_path);

    init_logging(&data_dir, !args.is_batch())?;

    let store = JsonFileStore::new(data_dir.clone())
        .with_context(|| format!("Failed to open data directory: {:?}", data_dir))?;
    let mut store = SessionStore::new(store);

    if args.is_batch() {
        return run_batch(&args, &mut store);
    }

    if args.no_timer {
        let mut settings = store.load_settings();
        settings.timer_enabled = false;
        store
            .save_settings(&settings)
            .context("Failed to save settings")?;
    }

    run_tui(store, CategoryFilter::parse(&args.category), config)
}

/// Log to stderr for one-shot commands, or to a file while the TUI owns the
/// terminal. `RUST_LOG` overrides the default `warn` level.
fn init_logging(data_dir: &Path, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if to_file {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
        let path = data_dir.join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
    }

    Ok(())
}

/// Non-interactive commands. Applied in order: reset, restore, import, export.
fn run_batch(args: &Args, store: &mut SessionStore<JsonFileStore>) -> Result<()> {
    if args.reset {
        store.clear().context("Failed to clear review state")?;
        println!("✓ Review state cleared");
    }

    if let Some(path) = &args.restore {
        let restored = store
            .import_backup(path)
            .with_context(|| format!("Failed to restore backup {:?}", path))?;
        println!("✓ Restored {} entries from {}", restored, path.display());
    }

    if let Some(csv_path) = &args.import {
        let categories = catalog::categories();
        let Some(category) = categories.iter().find(|c| c.id == args.import_category) else {
            let known: Vec<String> = categories
                .iter()
                .map(|c| format!("{} ({})", c.id, c.name))
                .collect();
            bail!(
                "Unknown category '{}'. Choose one of: {}",
                args.import_category,
                known.join(", ")
            );
        };

        let cards = store
            .import_csv(csv_path, &category.id)
            .with_context(|| format!("Failed to import {:?}", csv_path))?;
        println!("✓ Imported {} cards into '{}'", cards.len(), category.name);
    }

    if let Some(path) = &args.export {
        let written = store
            .export_backup(path)
            .with_context(|| format!("Failed to write backup {:?}", path))?;
        println!("✓ Exported {} entries to {}", written, path.display());
    }

    Ok(())
}

fn run_tui(store: SessionStore<JsonFileStore>, filter: CategoryFilter, config: Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, filter, config);

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "session ended with an error");
        eprintln!("Error: {}", err);
        return Err(err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        app.tick();
        terminal.draw(|frame| app.render(frame))?;
        app.handle_events()?;
    }
    Ok(())
}
