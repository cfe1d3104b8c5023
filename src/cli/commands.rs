use std::fmt::Write as _;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use time::format_description::well_known::Rfc3339;

use crate::app::Workspace;
use crate::journaling::AutoSaveEvent;
use crate::model::{Note, NoteColor, NoteId, Task, TaskId};

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Print every task in list order
    List,
    /// Add a task at the top of the list
    Add(TaskAddArgs),
    /// Mark a task completed
    Done(TaskRefArgs),
    /// Mark a task pending again
    Undone(TaskRefArgs),
    /// Change a task's title
    Rename(TaskRenameArgs),
    /// Delete a task
    Remove(TaskRefArgs),
    /// Move a task to the position another task holds
    Move(TaskMoveArgs),
    /// Delete every completed task
    ClearCompleted,
}

#[derive(Args, Debug, Clone)]
pub struct TaskAddArgs {
    /// Task title (words are joined with spaces)
    #[arg(required = true)]
    pub title: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskRefArgs {
    /// Task id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct TaskRenameArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// New title
    #[arg(required = true)]
    pub title: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskMoveArgs {
    /// Task to move
    pub source: String,
    /// Task whose position it takes
    pub target: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum NoteCommand {
    /// Print every note
    List,
    /// Create a note
    New(NoteNewArgs),
    /// Replace a note's text
    Edit(NoteEditArgs),
    /// Change a note's color (swatch name, hex value or any token)
    Color(NoteColorArgs),
    /// Move a note on screen
    Move(NoteMoveArgs),
    /// Resize a note
    Resize(NoteResizeArgs),
    /// Close and delete a note
    Delete(NoteRefArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NoteNewArgs {
    /// Initial text
    #[arg(default_value = "")]
    pub content: String,
    /// Initial color
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NoteRefArgs {
    /// Note id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct NoteEditArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    /// New text
    pub content: String,
}

#[derive(Args, Debug, Clone)]
pub struct NoteColorArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    pub color: String,
}

#[derive(Args, Debug, Clone)]
pub struct NoteMoveArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

#[derive(Args, Debug, Clone)]
pub struct NoteResizeArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    pub width: f64,
    pub height: f64,
}

pub fn summary(workspace: &Workspace) -> String {
    format!("{}\n", workspace.summary())
}

pub fn handle_task_command(workspace: &mut Workspace, command: TaskCommand) -> Result<String> {
    match command {
        TaskCommand::List => Ok(format_tasks(workspace)),
        TaskCommand::Add(args) => {
            let title = args.title.join(" ");
            let Some(id) = workspace.add_task(&title) else {
                bail!("task title cannot be empty");
            };
            Ok(format!("Added task {}\n", id.short()))
        }
        TaskCommand::Done(args) => set_completed(workspace, &args.id, true),
        TaskCommand::Undone(args) => set_completed(workspace, &args.id, false),
        TaskCommand::Rename(args) => {
            let id = resolve_task(workspace, &args.id)?;
            workspace.start_edit(id);
            workspace.set_edit_buffer(id, &args.title.join(" "));
            if workspace.save_edit(id) {
                Ok(format!("Renamed task {}\n", id.short()))
            } else {
                Ok(format!("Task {} unchanged\n", id.short()))
            }
        }
        TaskCommand::Remove(args) => {
            let id = resolve_task(workspace, &args.id)?;
            workspace.remove_task(id);
            Ok(format!("Removed task {}\n", id.short()))
        }
        TaskCommand::Move(args) => {
            let source = resolve_task(workspace, &args.source)?;
            let target = resolve_task(workspace, &args.target)?;
            if workspace.move_task(source, target) {
                Ok(format_tasks(workspace))
            } else {
                Ok("Nothing to move\n".to_string())
            }
        }
        TaskCommand::ClearCompleted => {
            let removed = workspace.clear_completed();
            Ok(format!("Cleared {removed} completed task(s)\n"))
        }
    }
}

pub fn handle_note_command(workspace: &mut Workspace, command: NoteCommand) -> Result<String> {
    match command {
        NoteCommand::List => Ok(format_notes(workspace)),
        NoteCommand::New(args) => {
            let color = args.color.as_deref().map(parse_color).unwrap_or_default();
            let id = workspace.create_note_with(&args.content, color);
            Ok(format!("Created note {}\n", id.short()))
        }
        NoteCommand::Edit(args) => {
            let id = resolve_note(workspace, &args.id)?;
            workspace.set_note_content(id, &args.content);
            Ok(format!("Updated note {}\n", id.short()))
        }
        NoteCommand::Color(args) => {
            let id = resolve_note(workspace, &args.id)?;
            workspace.set_note_color(id, parse_color(&args.color));
            Ok(format!("Recolored note {}\n", id.short()))
        }
        NoteCommand::Move(args) => {
            let id = resolve_note(workspace, &args.id)?;
            if !args.x.is_finite() || !args.y.is_finite() {
                bail!("note position must be finite");
            }
            workspace.set_note_position(id, args.x, args.y);
            Ok(format!("Moved note {}\n", id.short()))
        }
        NoteCommand::Resize(args) => {
            let id = resolve_note(workspace, &args.id)?;
            if !(args.width > 0.0 && args.height > 0.0) {
                bail!("note size must be positive");
            }
            workspace.set_note_size(id, args.width, args.height);
            Ok(format!("Resized note {}\n", id.short()))
        }
        NoteCommand::Delete(args) => {
            let id = resolve_note(workspace, &args.id)?;
            workspace.request_close(id);
            Ok(format!("Deleted note {}\n", id.short()))
        }
    }
}

pub fn count_failures(events: &[AutoSaveEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, AutoSaveEvent::Error { .. }))
        .count()
}

fn set_completed(workspace: &mut Workspace, prefix: &str, completed: bool) -> Result<String> {
    let id = resolve_task(workspace, prefix)?;
    workspace.set_task_completed(id, completed);
    let state = if completed { "done" } else { "pending" };
    Ok(format!("Task {} marked {state}\n", id.short()))
}

fn parse_color(raw: &str) -> NoteColor {
    raw.parse::<NoteColor>().unwrap_or_else(|never| match never {})
}

fn resolve_task(workspace: &Workspace, prefix: &str) -> Result<TaskId> {
    let matches: Vec<TaskId> = workspace
        .tasks()
        .iter()
        .map(|task| task.id)
        .filter(|id| id.matches_prefix(prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no task matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} tasks, use a longer prefix", matches.len()),
    }
}

fn resolve_note(workspace: &Workspace, prefix: &str) -> Result<NoteId> {
    let matches: Vec<NoteId> = workspace
        .notes()
        .map(|note| note.id)
        .filter(|id| id.matches_prefix(prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no note matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} notes, use a longer prefix", matches.len()),
    }
}

fn format_tasks(workspace: &Workspace) -> String {
    let mut out = String::new();
    for task in workspace.tasks() {
        let _ = writeln!(&mut out, "{}", format_task(task));
    }
    let _ = writeln!(&mut out, "{}", workspace.summary());
    out
}

fn format_task(task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    format!("[{mark}] {}  {}", task.id.short(), task.title)
}

fn format_notes(workspace: &Workspace) -> String {
    let mut out = String::new();
    let mut count = 0;
    for note in workspace.notes() {
        let _ = writeln!(&mut out, "{}", format_note(note));
        count += 1;
    }
    if count == 0 {
        out.push_str("No notes yet\n");
    }
    out
}

fn format_note(note: &Note) -> String {
    let created = note
        .created_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| "-".into());
    let first_line = note.content.lines().next().unwrap_or("");
    let mut line = format!(
        "{}  {}  at ({}, {}) {}x{}  created {created}",
        note.id.short(),
        note.color,
        note.position_x,
        note.position_y,
        note.width,
        note.height,
    );
    if !first_line.is_empty() {
        let _ = write!(&mut line, "\n    {first_line}");
    }
    line
}
