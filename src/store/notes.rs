use indexmap::IndexMap;

use crate::model::{Note, NoteColor, NoteId};

use super::{NoteField, StoreEvent};

/// Notes keyed by identity. Iteration follows insertion order so saved
/// snapshots stay stable between runs.
#[derive(Debug, Clone, Default)]
pub struct NoteSet {
    notes: IndexMap<NoteId, Note>,
}

impl NoteSet {
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let mut set = Self::default();
        for note in notes {
            if set.notes.contains_key(&note.id) {
                tracing::warn!(note_id = %note.id, "duplicate note id in snapshot, keeping first");
                continue;
            }
            set.notes.insert(note.id, note);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.notes.keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.values().cloned().collect()
    }

    pub fn insert(&mut self, note: Note) -> Option<StoreEvent> {
        if self.notes.contains_key(&note.id) {
            return None;
        }
        let id = note.id;
        self.notes.insert(id, note);
        Some(StoreEvent::NoteAdded { id })
    }

    pub fn remove(&mut self, id: NoteId) -> Option<StoreEvent> {
        self.notes.shift_remove(&id)?;
        Some(StoreEvent::NoteRemoved { id })
    }

    pub fn set_content(&mut self, id: NoteId, content: &str) -> Option<StoreEvent> {
        let note = self.notes.get_mut(&id)?;
        if note.content == content {
            return None;
        }
        note.content.clear();
        note.content.push_str(content);
        Some(StoreEvent::NoteChanged {
            id,
            field: NoteField::Content,
        })
    }

    pub fn set_color(&mut self, id: NoteId, color: NoteColor) -> Option<StoreEvent> {
        let note = self.notes.get_mut(&id)?;
        if note.color == color {
            return None;
        }
        note.color = color;
        Some(StoreEvent::NoteChanged {
            id,
            field: NoteField::Color,
        })
    }

    /// Non-finite coordinates are ignored.
    pub fn set_position(&mut self, id: NoteId, x: f64, y: f64) -> Option<StoreEvent> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let note = self.notes.get_mut(&id)?;
        if note.position_x == x && note.position_y == y {
            return None;
        }
        note.position_x = x;
        note.position_y = y;
        Some(StoreEvent::NoteChanged {
            id,
            field: NoteField::Position,
        })
    }

    /// Non-positive or non-finite extents are ignored.
    pub fn set_size(&mut self, id: NoteId, width: f64, height: f64) -> Option<StoreEvent> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return None;
        }
        let note = self.notes.get_mut(&id)?;
        if note.width == width && note.height == height {
            return None;
        }
        note.width = width;
        note.height = height;
        Some(StoreEvent::NoteChanged {
            id,
            field: NoteField::Size,
        })
    }

    pub(crate) fn set_save_status(&mut self, id: NoteId, status: &str) {
        if let Some(note) = self.notes.get_mut(&id) {
            note.save_status.clear();
            note.save_status.push_str(status);
        }
    }
}
