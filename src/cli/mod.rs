use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::Workspace;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::model::Note;
use crate::storage;
use crate::windows::{ViewHost, ViewId};

pub mod commands;

use self::commands::{NoteCommand, TaskCommand};

#[derive(Parser, Debug)]
#[command(
    name = "tasknotes",
    version,
    about = "Task list and sticky notes with autosave"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over TASKNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over TASKNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the task summary line (default)
    Summary,
    /// Work with the task list
    #[command(subcommand)]
    Task(TaskCommand),
    /// Work with sticky notes
    #[command(subcommand)]
    Note(NoteCommand),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let gateway = storage::open(&paths, &config.storage)?;

    let mut workspace = Workspace::load(gateway, Box::new(HeadlessHost), &config)?;
    let command = cli.command.unwrap_or(Commands::Summary);
    let output = match command {
        Commands::Summary => Ok(commands::summary(&workspace)),
        Commands::Task(cmd) => commands::handle_task_command(&mut workspace, cmd),
        Commands::Note(cmd) => commands::handle_note_command(&mut workspace, cmd),
    };
    let failures = commands::count_failures(&workspace.shutdown());

    print!("{}", output?);
    if failures > 0 {
        anyhow::bail!("{failures} snapshot write(s) failed, see log for details");
    }
    Ok(())
}

/// Stands in for a windowing toolkit when running from a terminal.
struct HeadlessHost;

impl ViewHost for HeadlessHost {
    fn open_view(&mut self, view: ViewId, note: &Note) {
        tracing::debug!(%view, note_id = %note.id, "view opened");
    }

    fn activate_view(&mut self, view: ViewId) {
        tracing::debug!(%view, "view activated");
    }

    fn close_view(&mut self, view: ViewId) {
        tracing::debug!(%view, "view closed");
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
