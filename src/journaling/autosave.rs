use std::sync::Arc;
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::config::AutoSaveConfig;
use crate::model::NoteId;
use crate::store::{EntityClass, EntityStore, MutationIntent, StoreEvent};

use super::clock::Clock;
use super::debounce::DebounceScheduler;
use super::saver::{SaveExecutor, SaveOutcome, SaveRequest};

pub const SAVING_STATUS: &str = "Saving...";
pub const SAVED_STATUS: &str = "Saved ✓";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SavePolicy {
    Immediate,
    Debounced,
}

/// Immediate-versus-debounced lookup. Structural and completion changes
/// must never lag behind what the user sees; note field edits are
/// coalesced.
pub fn save_policy(class: EntityClass, intent: MutationIntent) -> SavePolicy {
    match (class, intent) {
        (EntityClass::Notes, MutationIntent::FieldEdited) => SavePolicy::Debounced,
        (EntityClass::Notes, _) => SavePolicy::Immediate,
        (EntityClass::Tasks, MutationIntent::StructuralChange)
        | (EntityClass::Tasks, MutationIntent::CompletionChanged)
        | (EntityClass::Tasks, MutationIntent::FieldEdited) => SavePolicy::Immediate,
    }
}

/// The two stages of a note save, sharing one debounce key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoteStage {
    Save,
    ClearStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveSettings {
    pub note_debounce: Duration,
    pub status_clear: Duration,
}

impl From<&AutoSaveConfig> for AutoSaveSettings {
    fn from(config: &AutoSaveConfig) -> Self {
        Self {
            note_debounce: Duration::from_millis(config.note_debounce_ms),
            status_clear: Duration::from_millis(config.status_clear_ms),
        }
    }
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self::from(&AutoSaveConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Idle {
        last_saved_at: Option<OffsetDateTime>,
    },
    Pending {
        since: OffsetDateTime,
    },
    Error {
        message: String,
        occurred_at: OffsetDateTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveEvent {
    Saved {
        class: EntityClass,
        timestamp: OffsetDateTime,
    },
    Error {
        class: EntityClass,
        message: String,
    },
}

#[derive(Debug, Clone)]
struct AutoSaveFailure {
    message: String,
    occurred_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct ClassState {
    in_flight: usize,
    submitted_at: Option<OffsetDateTime>,
    last_saved_at: Option<OffsetDateTime>,
    last_error: Option<AutoSaveFailure>,
}

/// Turns store events into snapshot writes.
///
/// Task-list changes and note structure changes are written right away.
/// Note field edits go through a two-stage debounce keyed by note id: after
/// a quiet period the note set is saved and the note shows [`SAVED_STATUS`];
/// a second delay later the status is cleared. Any further edit replaces
/// whichever stage is pending, so the chain is cancelled as a unit.
///
/// Write failures are logged and recorded in [`AutoSaveStatus::Error`]; they
/// never propagate. The in-memory store stays authoritative and the next
/// mutation writes a fresh snapshot.
pub struct PersistenceBridge {
    settings: AutoSaveSettings,
    scheduler: DebounceScheduler<NoteId, NoteStage>,
    executor: Box<dyn SaveExecutor>,
    tasks: ClassState,
    notes: ClassState,
}

impl PersistenceBridge {
    pub fn new(
        settings: AutoSaveSettings,
        executor: Box<dyn SaveExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            scheduler: DebounceScheduler::new(clock),
            executor,
            tasks: ClassState::default(),
            notes: ClassState::default(),
        }
    }

    pub fn settings(&self) -> AutoSaveSettings {
        self.settings
    }

    pub fn observe(&mut self, event: &StoreEvent, store: &mut EntityStore) {
        let class = event.class();
        match save_policy(class, event.intent()) {
            SavePolicy::Immediate => {
                if let StoreEvent::NoteRemoved { id } = event {
                    self.scheduler.cancel(id);
                }
                self.save_class(class, store);
            }
            SavePolicy::Debounced => {
                let Some(id) = event.note_id() else {
                    return;
                };
                self.scheduler
                    .schedule(id, self.settings.note_debounce, NoteStage::Save);
                store.notes.set_save_status(id, SAVING_STATUS);
            }
        }
    }

    /// Runs due debounce stages and collects finished writes.
    pub fn tick(&mut self, store: &mut EntityStore) -> Vec<AutoSaveEvent> {
        for (id, stage) in self.scheduler.poll() {
            self.run_stage(id, stage, store);
        }
        let outcomes = self.executor.drain();
        self.absorb(outcomes)
    }

    /// Cancels any pending stage for `id` and writes the note set now,
    /// whether or not anything was pending.
    pub fn flush_note(&mut self, id: NoteId, store: &mut EntityStore) {
        // The pending stage is dropped rather than run: the save below covers
        // `Save`, and the status is cleared here in place of `ClearStatus`.
        if let Some(stage) = self.scheduler.flush(&id) {
            tracing::debug!(note_id = %id, ?stage, "dropping pending note stage for flush");
        }
        store.notes.set_save_status(id, "");
        self.save_class(EntityClass::Notes, store);
    }

    /// Writes every note with a pending save stage in a single snapshot.
    pub fn flush_all(&mut self, store: &mut EntityStore) {
        let mut needs_save = false;
        for id in self.scheduler.keys() {
            if let Some(stage) = self.scheduler.flush(&id) {
                needs_save |= stage == NoteStage::Save;
                store.notes.set_save_status(id, "");
            }
        }
        if needs_save {
            self.save_class(EntityClass::Notes, store);
        }
    }

    /// Flushes pending work and waits for the executor to finish writing.
    pub fn shutdown(&mut self, store: &mut EntityStore) -> Vec<AutoSaveEvent> {
        self.flush_all(store);
        let outcomes = self.executor.shutdown();
        self.absorb(outcomes)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn pending_stage(&self, id: NoteId) -> Option<NoteStage> {
        self.scheduler.pending_action(&id).copied()
    }

    pub fn status(&self, class: EntityClass) -> AutoSaveStatus {
        let state = self.state(class);
        let debounced_save = class == EntityClass::Notes
            && self
                .scheduler
                .keys()
                .iter()
                .any(|id| self.pending_stage(*id) == Some(NoteStage::Save));
        if state.in_flight > 0 || debounced_save {
            return AutoSaveStatus::Pending {
                since: state.submitted_at.unwrap_or_else(OffsetDateTime::now_utc),
            };
        }
        if let Some(failure) = &state.last_error {
            return AutoSaveStatus::Error {
                message: failure.message.clone(),
                occurred_at: failure.occurred_at,
            };
        }
        AutoSaveStatus::Idle {
            last_saved_at: state.last_saved_at,
        }
    }

    fn run_stage(&mut self, id: NoteId, stage: NoteStage, store: &mut EntityStore) {
        match stage {
            NoteStage::Save => {
                if !store.notes.contains(id) {
                    return;
                }
                self.save_class(EntityClass::Notes, store);
                store.notes.set_save_status(id, SAVED_STATUS);
                self.scheduler
                    .schedule(id, self.settings.status_clear, NoteStage::ClearStatus);
            }
            NoteStage::ClearStatus => store.notes.set_save_status(id, ""),
        }
    }

    fn save_class(&mut self, class: EntityClass, store: &EntityStore) {
        let request = match class {
            EntityClass::Tasks => SaveRequest::Tasks(store.tasks.as_slice().to_vec()),
            EntityClass::Notes => SaveRequest::Notes(store.notes.snapshot()),
        };
        let state = self.state_mut(class);
        state.in_flight += 1;
        state.submitted_at = Some(OffsetDateTime::now_utc());
        tracing::trace!(?class, "submitting snapshot");
        self.executor.submit(request);
    }

    fn absorb(&mut self, outcomes: Vec<SaveOutcome>) -> Vec<AutoSaveEvent> {
        let mut events = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let class = outcome.class;
            let state = self.state_mut(class);
            state.in_flight = state.in_flight.saturating_sub(1 + outcome.superseded);
            match outcome.result {
                Ok(()) => {
                    state.last_saved_at = Some(outcome.finished_at);
                    state.last_error = None;
                    tracing::debug!(?class, "snapshot saved");
                    events.push(AutoSaveEvent::Saved {
                        class,
                        timestamp: outcome.finished_at,
                    });
                }
                Err(message) => {
                    tracing::warn!(?class, error = %message, "snapshot save failed; keeping in-memory state");
                    state.last_error = Some(AutoSaveFailure {
                        message: message.clone(),
                        occurred_at: outcome.finished_at,
                    });
                    events.push(AutoSaveEvent::Error { class, message });
                }
            }
        }
        events
    }

    fn state(&self, class: EntityClass) -> &ClassState {
        match class {
            EntityClass::Tasks => &self.tasks,
            EntityClass::Notes => &self.notes,
        }
    }

    fn state_mut(&mut self, class: EntityClass) -> &mut ClassState {
        match class {
            EntityClass::Tasks => &mut self.tasks,
            EntityClass::Notes => &mut self.notes,
        }
    }
}
