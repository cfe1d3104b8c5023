//! Storage gateway: loads and saves full snapshots of the task list and the
//! note set. The core never touches files directly; it only talks to a
//! [`StorageGateway`].

use std::io;
use std::path::PathBuf;

use crate::config::{ConfigPaths, StorageBackend, StorageOptions};
use crate::model::{Note, Task};

mod json;
mod schema;
mod sqlite;

pub use json::JsonGateway;
pub use sqlite::SqliteGateway;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Full-snapshot persistence for both entity classes. Every save overwrites
/// whatever was stored before.
pub trait StorageGateway: Send + 'static {
    fn load_tasks(&self) -> StorageResult<Vec<Task>>;
    fn save_tasks(&self, tasks: &[Task]) -> StorageResult<()>;
    fn load_notes(&self) -> StorageResult<Vec<Note>>;
    fn save_notes(&self, notes: &[Note]) -> StorageResult<()>;
}

impl<G: StorageGateway + ?Sized> StorageGateway for Box<G> {
    fn load_tasks(&self) -> StorageResult<Vec<Task>> {
        (**self).load_tasks()
    }

    fn save_tasks(&self, tasks: &[Task]) -> StorageResult<()> {
        (**self).save_tasks(tasks)
    }

    fn load_notes(&self) -> StorageResult<Vec<Note>> {
        (**self).load_notes()
    }

    fn save_notes(&self, notes: &[Note]) -> StorageResult<()> {
        (**self).save_notes(notes)
    }
}

pub fn open(
    paths: &ConfigPaths,
    options: &StorageOptions,
) -> anyhow::Result<Box<dyn StorageGateway>> {
    let gateway: Box<dyn StorageGateway> = match options.backend {
        StorageBackend::Json => {
            tracing::debug!(dir = %paths.data_dir.display(), "using json snapshot storage");
            Box::new(JsonGateway::new(
                paths.tasks_file.clone(),
                paths.notes_file.clone(),
            )?)
        }
        StorageBackend::Sqlite => {
            tracing::debug!(db = %paths.database_path.display(), "using sqlite storage");
            Box::new(SqliteGateway::open(&paths.database_path, options)?)
        }
    };
    Ok(gateway)
}
