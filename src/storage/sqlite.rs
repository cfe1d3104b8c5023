use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use rusqlite::{params, Connection};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::model::{Note, NoteColor, NoteId, Task, TaskId};

use super::{schema, StorageError, StorageGateway, StorageResult};

/// Both entity classes in one SQLite database. A save replaces the whole
/// table inside a single transaction.
#[derive(Clone)]
pub struct SqliteGateway {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteGateway {
    pub fn open(db_path: &Path, options: &StorageOptions) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        prepare_connection(&conn, options)?;
        schema::apply(&conn)?;
        Ok(Self {
            db_path: Arc::new(db_path.to_path_buf()),
            options: Arc::new(options.clone()),
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> StorageResult<Connection> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)
            .map_err(|err| StorageError::Corrupt(format!("{err:#}")))?;
        Ok(conn)
    }

    fn with_connection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T>,
    {
        let mut conn = self.connect()?;
        f(&mut conn)
    }
}

impl StorageGateway for SqliteGateway {
    fn load_tasks(&self) -> StorageResult<Vec<Task>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, is_completed, created_at FROM tasks ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)? != 0,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(id, title, is_completed, created_at)| -> StorageResult<Task> {
                    let id: TaskId = parse_id(&id)?;
                    Ok(Task::restore(id, title, is_completed, parse_timestamp(&created_at)?))
                })
                .collect()
        })
    }

    fn save_tasks(&self, tasks: &[Task]) -> StorageResult<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM tasks", [])?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO tasks (id, position, title, is_completed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (position, task) in tasks.iter().enumerate() {
                    insert.execute(params![
                        task.id.to_string(),
                        position as i64,
                        task.title,
                        if task.is_completed { 1 } else { 0 },
                        format_timestamp(task.created_at)?,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn load_notes(&self) -> StorageResult<Vec<Note>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, color, position_x, position_y, width, height, created_at
                 FROM notes ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(
                    |(id, content, color, x, y, width, height, created_at)| -> StorageResult<Note> {
                        let id: NoteId = parse_id(&id)?;
                        Ok(Note {
                            id,
                            content,
                            color: color
                                .parse::<NoteColor>()
                                .unwrap_or_else(|never| match never {}),
                            position_x: x,
                            position_y: y,
                            width,
                            height,
                            created_at: parse_timestamp(&created_at)?,
                            save_status: String::new(),
                        })
                    },
                )
                .collect()
        })
    }

    fn save_notes(&self, notes: &[Note]) -> StorageResult<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM notes", [])?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO notes (id, position, content, color, position_x, position_y,
                                        width, height, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for (position, note) in notes.iter().enumerate() {
                    insert.execute(params![
                        note.id.to_string(),
                        position as i64,
                        note.content,
                        note.color.token(),
                        note.position_x,
                        note.position_y,
                        note.width,
                        note.height,
                        format_timestamp(note.created_at)?,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn prepare_connection(conn: &Connection, options: &StorageOptions) -> anyhow::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        options.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn parse_id<I: std::str::FromStr>(raw: &str) -> StorageResult<I> {
    raw.parse()
        .map_err(|_| StorageError::Corrupt(format!("invalid id {raw:?}")))
}

fn parse_timestamp(raw: &str) -> StorageResult<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| StorageError::Corrupt(format!("invalid timestamp {raw:?}: {err}")))
}

fn format_timestamp(value: OffsetDateTime) -> StorageResult<String> {
    value
        .format(&Rfc3339)
        .map_err(|err| StorageError::Corrupt(format!("unformattable timestamp: {err}")))
}
