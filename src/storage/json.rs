use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Note, Task};

use super::{StorageError, StorageGateway, StorageResult};

const SNAPSHOT_TMP_EXTENSION: &str = "json.tmp";

/// Two pretty-printed JSON files, one per entity class.
#[derive(Debug, Clone)]
pub struct JsonGateway {
    tasks_path: PathBuf,
    notes_path: PathBuf,
}

impl JsonGateway {
    pub fn new(tasks_path: PathBuf, notes_path: PathBuf) -> anyhow::Result<Self> {
        for path in [&tasks_path, &notes_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating data directory {}", parent.display()))?;
            }
        }
        Ok(Self {
            tasks_path,
            notes_path,
        })
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn notes_path(&self) -> &Path {
        &self.notes_path
    }
}

impl StorageGateway for JsonGateway {
    fn load_tasks(&self) -> StorageResult<Vec<Task>> {
        read_snapshot(&self.tasks_path)
    }

    fn save_tasks(&self, tasks: &[Task]) -> StorageResult<()> {
        write_snapshot(&self.tasks_path, tasks)
    }

    fn load_notes(&self) -> StorageResult<Vec<Note>> {
        read_snapshot(&self.notes_path)
    }

    fn save_notes(&self, notes: &[Note]) -> StorageResult<()> {
        write_snapshot(&self.notes_path, notes)
    }
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&raw).map_err(|source| StorageError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn write_snapshot<T: Serialize>(path: &Path, items: &[T]) -> StorageResult<()> {
    let json = serde_json::to_vec_pretty(items).map_err(|source| StorageError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension(SNAPSHOT_TMP_EXTENSION);
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&tmp_path, &json).map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteColor, Swatch};
    use tempfile::TempDir;

    fn gateway(temp: &TempDir) -> anyhow::Result<JsonGateway> {
        let data = temp.path().join("data");
        JsonGateway::new(data.join("todos.json"), data.join("stickynotes.json"))
    }

    #[test]
    fn missing_files_load_as_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let gateway = gateway(&temp)?;
        assert!(gateway.load_tasks()?.is_empty());
        assert!(gateway.load_notes()?.is_empty());
        Ok(())
    }

    #[test]
    fn snapshots_overwrite_previous_contents() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let gateway = gateway(&temp)?;
        let first = vec![Task::new("one"), Task::new("two")];
        gateway.save_tasks(&first)?;
        let second = vec![Task::new("three")];
        gateway.save_tasks(&second)?;

        let loaded = gateway.load_tasks()?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, second[0].id);
        assert_eq!(loaded[0].created_at, second[0].created_at);
        assert!(!gateway
            .tasks_path()
            .with_extension(SNAPSHOT_TMP_EXTENSION)
            .exists());
        Ok(())
    }

    #[test]
    fn notes_keep_geometry_and_color() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let gateway = gateway(&temp)?;
        let mut note = Note::new();
        note.content = "hello".into();
        note.color = NoteColor::Swatch(Swatch::Purple);
        note.position_x = 40.0;
        note.height = 180.0;
        gateway.save_notes(&[note.clone()])?;

        let loaded = gateway.load_notes()?;
        assert_eq!(loaded, vec![note]);
        Ok(())
    }

    #[test]
    fn malformed_snapshot_is_reported() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let gateway = gateway(&temp)?;
        fs::write(gateway.notes_path(), b"{ not json")?;
        let err = gateway.load_notes().expect_err("should fail");
        assert!(matches!(err, StorageError::Format { .. }));
        Ok(())
    }
}
