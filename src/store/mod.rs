//! In-memory entity store: the single source of truth for tasks and notes.
//!
//! Every mutating operation returns the [`StoreEvent`] it produced (or
//! `None` when nothing changed). Callers publish those events to the
//! persistence bridge and the window registry explicitly; the store never
//! calls back into its observers.

use crate::model::{NoteId, TaskId};

mod notes;
mod reorder;
mod tasks;

pub use notes::NoteSet;
pub use reorder::move_by_identity;
pub use tasks::{TaskList, TaskSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Tasks,
    Notes,
}

/// What kind of change an event represents, independent of which entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationIntent {
    StructuralChange,
    CompletionChanged,
    FieldEdited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Content,
    Color,
    Position,
    Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskAdded { id: TaskId, index: usize },
    TaskRemoved { id: TaskId },
    TasksCleared { ids: Vec<TaskId> },
    TaskMoved { id: TaskId, from: usize, to: usize },
    TaskChanged { id: TaskId, field: TaskField },
    NoteAdded { id: NoteId },
    NoteRemoved { id: NoteId },
    NoteChanged { id: NoteId, field: NoteField },
}

impl StoreEvent {
    pub fn class(&self) -> EntityClass {
        match self {
            StoreEvent::TaskAdded { .. }
            | StoreEvent::TaskRemoved { .. }
            | StoreEvent::TasksCleared { .. }
            | StoreEvent::TaskMoved { .. }
            | StoreEvent::TaskChanged { .. } => EntityClass::Tasks,
            StoreEvent::NoteAdded { .. }
            | StoreEvent::NoteRemoved { .. }
            | StoreEvent::NoteChanged { .. } => EntityClass::Notes,
        }
    }

    pub fn intent(&self) -> MutationIntent {
        match self {
            StoreEvent::TaskAdded { .. }
            | StoreEvent::TaskRemoved { .. }
            | StoreEvent::TasksCleared { .. }
            | StoreEvent::TaskMoved { .. }
            | StoreEvent::NoteAdded { .. }
            | StoreEvent::NoteRemoved { .. } => MutationIntent::StructuralChange,
            StoreEvent::TaskChanged {
                field: TaskField::Completion,
                ..
            } => MutationIntent::CompletionChanged,
            StoreEvent::TaskChanged {
                field: TaskField::Title,
                ..
            }
            | StoreEvent::NoteChanged { .. } => MutationIntent::FieldEdited,
        }
    }

    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            StoreEvent::NoteAdded { id }
            | StoreEvent::NoteRemoved { id }
            | StoreEvent::NoteChanged { id, .. } => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    pub tasks: TaskList,
    pub notes: NoteSet,
}

impl EntityStore {
    pub fn new(tasks: TaskList, notes: NoteSet) -> Self {
        Self { tasks, notes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_follow_event_shape() {
        let task = TaskId::new();
        let note = NoteId::new();
        assert_eq!(
            StoreEvent::TaskMoved { id: task, from: 0, to: 1 }.intent(),
            MutationIntent::StructuralChange
        );
        assert_eq!(
            StoreEvent::TaskChanged { id: task, field: TaskField::Completion }.intent(),
            MutationIntent::CompletionChanged
        );
        assert_eq!(
            StoreEvent::NoteChanged { id: note, field: NoteField::Size }.intent(),
            MutationIntent::FieldEdited
        );
        assert_eq!(StoreEvent::NoteRemoved { id: note }.class(), EntityClass::Notes);
        assert_eq!(StoreEvent::NoteAdded { id: note }.note_id(), Some(note));
        assert_eq!(StoreEvent::TaskRemoved { id: task }.note_id(), None);
    }
}
