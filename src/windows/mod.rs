//! One live view per note.
//!
//! The registry maps a note id to the view currently showing it. Opening a
//! note that already has a view re-activates that view instead of creating
//! another one. Views closed by the host (window manager close button) only
//! drop the registry entry; deleting the note is a separate, explicit action
//! handled by the workspace.

use std::collections::HashMap;
use std::fmt;

use crate::model::{Note, NoteId};
use crate::store::{NoteSet, StoreEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Host-side window management, driven by the registry.
pub trait ViewHost {
    /// Show a new view for `note`. Position and size come from the note.
    fn open_view(&mut self, view: ViewId, note: &Note);
    /// Bring an existing view to the front.
    fn activate_view(&mut self, view: ViewId);
    /// Tear the view down; the registry has already forgotten it.
    fn close_view(&mut self, view: ViewId);
}

#[derive(Debug, Default)]
pub struct WindowRegistry {
    entries: HashMap<NoteId, ViewId>,
    next_view: u64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_open(&self, id: NoteId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn view_for(&self, id: NoteId) -> Option<ViewId> {
        self.entries.get(&id).copied()
    }

    pub fn open_or_activate(&mut self, note: &Note, host: &mut dyn ViewHost) -> ViewId {
        if let Some(view) = self.view_for(note.id) {
            tracing::debug!(note_id = %note.id, %view, "re-activating existing view");
            host.activate_view(view);
            return view;
        }
        let view = ViewId(self.next_view);
        self.next_view += 1;
        self.entries.insert(note.id, view);
        tracing::debug!(note_id = %note.id, %view, "opening view");
        host.open_view(view, note);
        view
    }

    /// Forgets the entry for `id` and hands back its view for release.
    pub fn remove(&mut self, id: NoteId) -> Option<ViewId> {
        self.entries.remove(&id)
    }

    /// The host closed the view on its own; the note itself stays.
    pub fn on_external_view_closed(&mut self, id: NoteId) -> bool {
        match self.entries.remove(&id) {
            Some(view) => {
                tracing::debug!(note_id = %id, %view, "view closed by host");
                true
            }
            None => false,
        }
    }

    /// Store subscriber: new notes get a view, removed notes lose theirs.
    pub fn observe(&mut self, event: &StoreEvent, notes: &NoteSet, host: &mut dyn ViewHost) {
        match event {
            StoreEvent::NoteAdded { id } => {
                if let Some(note) = notes.get(*id) {
                    self.open_or_activate(note, host);
                }
            }
            StoreEvent::NoteRemoved { id } => {
                if let Some(view) = self.remove(*id) {
                    host.close_view(view);
                }
            }
            _ => {}
        }
    }
}
