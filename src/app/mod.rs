use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::config::AppConfig;
use crate::journaling::{
    AutoSaveEvent, AutoSaveSettings, AutoSaveStatus, BackgroundSaver, Clock, InlineSaver,
    NoteStage, PersistenceBridge, SaveExecutor, SystemClock,
};
use crate::model::{Note, NoteColor, NoteId, Task, TaskId};
use crate::storage::StorageGateway;
use crate::store::{EntityClass, EntityStore, NoteSet, StoreEvent, TaskList};
use crate::windows::{ViewHost, ViewId, WindowRegistry};

/// Everything the host UI talks to: the entity store plus its two
/// subscribers, the persistence bridge and the window registry.
///
/// All methods run on the caller's thread. Mutations return immediately;
/// disk writes happen in the save executor and debounced work runs from
/// [`tick`](Self::tick), which the host calls from its event loop.
///
/// Call [`shutdown`](Self::shutdown) before exiting to collect the final
/// write outcomes. Dropping the workspace still writes debounced note edits
/// that have not fired yet, but any failure is only logged.
pub struct Workspace {
    store: EntityStore,
    bridge: PersistenceBridge,
    registry: WindowRegistry,
    host: Box<dyn ViewHost>,
}

impl Workspace {
    /// Loads both snapshots through `gateway` and wires up autosave as
    /// configured. Unreadable snapshots start empty.
    pub fn load<G: StorageGateway>(
        gateway: G,
        host: Box<dyn ViewHost>,
        config: &AppConfig,
    ) -> Result<Self> {
        let tasks = gateway.load_tasks().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not load tasks, starting with an empty list");
            Vec::new()
        });
        let notes = gateway.load_notes().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not load notes, starting with none");
            Vec::new()
        });
        tracing::info!(tasks = tasks.len(), notes = notes.len(), "loaded snapshots");

        let executor: Box<dyn SaveExecutor> = if config.auto_save.background_io {
            Box::new(BackgroundSaver::spawn(gateway)?)
        } else {
            Box::new(InlineSaver::new(gateway))
        };
        let store = EntityStore::new(TaskList::from_tasks(tasks), NoteSet::from_notes(notes));
        let mut workspace = Self::with_parts(
            store,
            executor,
            Arc::new(SystemClock),
            AutoSaveSettings::from(&config.auto_save),
            host,
        );
        if config.windows.restore_on_start {
            workspace.restore_views();
        }
        Ok(workspace)
    }

    pub fn with_parts(
        store: EntityStore,
        executor: Box<dyn SaveExecutor>,
        clock: Arc<dyn Clock>,
        settings: AutoSaveSettings,
        host: Box<dyn ViewHost>,
    ) -> Self {
        Self {
            store,
            bridge: PersistenceBridge::new(settings, executor, clock),
            registry: WindowRegistry::new(),
            host,
        }
    }

    fn publish(&mut self, event: StoreEvent) {
        tracing::trace!(?event, "publishing store event");
        self.bridge.observe(&event, &mut self.store);
        self.registry
            .observe(&event, &self.store.notes, self.host.as_mut());
    }

    fn publish_opt(&mut self, event: Option<StoreEvent>) -> bool {
        match event {
            Some(event) => {
                self.publish(event);
                true
            }
            None => false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks.as_slice()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.tasks.get(id)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.store.notes.iter()
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.store.notes.get(id)
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn summary(&self) -> String {
        self.store.tasks.summary().label()
    }

    pub fn can_clear_completed(&self) -> bool {
        self.store.tasks.can_clear_completed()
    }

    pub fn add_task(&mut self, title: &str) -> Option<TaskId> {
        let event = self.store.tasks.add(title)?;
        let id = match &event {
            StoreEvent::TaskAdded { id, .. } => Some(*id),
            _ => None,
        };
        self.publish(event);
        id
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let event = self.store.tasks.remove(id);
        self.publish_opt(event)
    }

    pub fn set_task_completed(&mut self, id: TaskId, completed: bool) -> bool {
        let event = self.store.tasks.set_completed(id, completed);
        self.publish_opt(event)
    }

    pub fn toggle_task_completed(&mut self, id: TaskId) -> bool {
        let event = self.store.tasks.toggle_completed(id);
        self.publish_opt(event)
    }

    pub fn clear_completed(&mut self) -> usize {
        match self.store.tasks.clear_completed() {
            Some(event) => {
                let removed = match &event {
                    StoreEvent::TasksCleared { ids } => ids.len(),
                    _ => 0,
                };
                self.publish(event);
                removed
            }
            None => 0,
        }
    }

    /// Drop handler for drag-and-drop reordering.
    pub fn move_task(&mut self, source: TaskId, target: TaskId) -> bool {
        let event = self.store.tasks.move_task(source, target);
        self.publish_opt(event)
    }

    pub fn start_edit(&mut self, id: TaskId) {
        self.store.tasks.start_edit(id);
    }

    pub fn set_edit_buffer(&mut self, id: TaskId, text: &str) {
        self.store.tasks.set_edit_buffer(id, text);
    }

    pub fn save_edit(&mut self, id: TaskId) -> bool {
        let event = self.store.tasks.save_edit(id);
        self.publish_opt(event)
    }

    pub fn cancel_edit(&mut self, id: TaskId) {
        self.store.tasks.cancel_edit(id);
    }

    pub fn create_note(&mut self) -> NoteId {
        self.insert_note(Note::new())
    }

    pub fn create_note_with(&mut self, content: &str, color: NoteColor) -> NoteId {
        let mut note = Note::new();
        note.content = content.to_string();
        note.color = color;
        self.insert_note(note)
    }

    fn insert_note(&mut self, note: Note) -> NoteId {
        let id = note.id;
        let event = self.store.notes.insert(note);
        self.publish_opt(event);
        id
    }

    pub fn set_note_content(&mut self, id: NoteId, content: &str) -> bool {
        let event = self.store.notes.set_content(id, content);
        self.publish_opt(event)
    }

    pub fn set_note_color(&mut self, id: NoteId, color: NoteColor) -> bool {
        let event = self.store.notes.set_color(id, color);
        self.publish_opt(event)
    }

    pub fn set_note_position(&mut self, id: NoteId, x: f64, y: f64) -> bool {
        let event = self.store.notes.set_position(id, x, y);
        self.publish_opt(event)
    }

    pub fn set_note_size(&mut self, id: NoteId, width: f64, height: f64) -> bool {
        let event = self.store.notes.set_size(id, width, height);
        self.publish_opt(event)
    }

    /// Shows the note's view, re-activating it when one is already open.
    /// Unknown ids (for example a note deleted a moment ago) are ignored.
    pub fn open_or_activate(&mut self, id: NoteId) -> Option<ViewId> {
        let note = self.store.notes.get(id)?;
        Some(self.registry.open_or_activate(note, self.host.as_mut()))
    }

    /// The note's own close action: save its final state, then delete it
    /// and release its view.
    pub fn request_close(&mut self, id: NoteId) -> bool {
        if !self.store.notes.contains(id) && !self.registry.is_open(id) {
            return false;
        }
        self.bridge.flush_note(id, &mut self.store);
        let view = self.registry.remove(id);
        let event = self.store.notes.remove(id);
        self.publish_opt(event);
        if let Some(view) = view {
            self.host.close_view(view);
        }
        tracing::info!(note_id = %id, "note closed and deleted");
        true
    }

    /// The host closed the view by other means; the note is kept.
    pub fn on_external_view_closed(&mut self, id: NoteId) -> bool {
        self.registry.on_external_view_closed(id)
    }

    /// Runs due debounce stages and reports finished writes.
    pub fn tick(&mut self) -> Vec<AutoSaveEvent> {
        self.bridge.tick(&mut self.store)
    }

    /// When the host should call [`tick`](Self::tick) next, if anything is
    /// waiting on a timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.bridge.next_deadline()
    }

    pub fn pending_stage(&self, id: NoteId) -> Option<NoteStage> {
        self.bridge.pending_stage(id)
    }

    pub fn autosave_status(&self, class: EntityClass) -> AutoSaveStatus {
        self.bridge.status(class)
    }

    /// Writes anything still pending and waits for the writes to land.
    pub fn shutdown(&mut self) -> Vec<AutoSaveEvent> {
        let events = self.bridge.shutdown(&mut self.store);
        tracing::info!(writes = events.len(), "autosave drained");
        events
    }

    fn restore_views(&mut self) {
        for id in self.store.notes.ids() {
            self.open_or_activate(id);
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.bridge.next_deadline().is_none() {
            return;
        }
        tracing::debug!("workspace dropped with debounced note edits pending, flushing");
        let failures = self
            .bridge
            .shutdown(&mut self.store)
            .iter()
            .filter(|event| matches!(event, AutoSaveEvent::Error { .. }))
            .count();
        if failures > 0 {
            tracing::warn!(failures, "snapshot writes failed while dropping workspace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journaling::ManualClock;
    use crate::storage::testing::RecordingGateway;
    use crate::windows::testing::{HostCall, RecordingHost};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shares the recorded calls with the test after the workspace takes
    /// ownership of the host.
    #[derive(Clone, Default)]
    struct SharedHost(Rc<RefCell<RecordingHost>>);

    impl ViewHost for SharedHost {
        fn open_view(&mut self, view: ViewId, note: &Note) {
            self.0.borrow_mut().open_view(view, note);
        }

        fn activate_view(&mut self, view: ViewId) {
            self.0.borrow_mut().activate_view(view);
        }

        fn close_view(&mut self, view: ViewId) {
            self.0.borrow_mut().close_view(view);
        }
    }

    struct Fixture {
        clock: ManualClock,
        gateway: RecordingGateway,
        host: SharedHost,
        workspace: Workspace,
    }

    fn fixture_with(gateway: RecordingGateway) -> Fixture {
        let clock = ManualClock::new();
        let host = SharedHost::default();
        let store = EntityStore::new(
            TaskList::from_tasks(gateway.load_tasks().unwrap()),
            NoteSet::from_notes(gateway.load_notes().unwrap()),
        );
        let workspace = Workspace::with_parts(
            store,
            Box::new(InlineSaver::new(gateway.clone())),
            Arc::new(clock.clone()),
            AutoSaveSettings::default(),
            Box::new(host.clone()),
        );
        Fixture {
            clock,
            gateway,
            host,
            workspace,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingGateway::default())
    }

    #[test]
    fn task_scenario_summary_and_clear() {
        let mut f = fixture();
        f.workspace.add_task("Buy milk").unwrap();
        let t2 = f.workspace.add_task("Pay bills").unwrap();
        assert!(f.workspace.set_task_completed(t2, true));
        assert_eq!(f.workspace.summary(), "1 pending • 1 completed • 2 total");

        assert_eq!(f.workspace.clear_completed(), 1);
        let titles: Vec<&str> = f.workspace.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Buy milk"]);

        let saves = f.gateway.task_saves();
        assert_eq!(saves.len(), 4, "add, add, complete, clear each save at once");
        assert_eq!(saves.last().unwrap().len(), 1);
    }

    #[test]
    fn reorder_saves_exactly_once() {
        let mut f = fixture();
        let a = f.workspace.add_task("a").unwrap();
        let _b = f.workspace.add_task("b").unwrap();
        let c = f.workspace.add_task("c").unwrap();
        let before = f.gateway.task_saves().len();

        assert!(f.workspace.move_task(c, a));
        assert!(!f.workspace.move_task(c, c));
        assert!(!f.workspace.move_task(TaskId::new(), a));

        let saves = f.gateway.task_saves();
        assert_eq!(saves.len(), before + 1);
        let order: Vec<&str> = saves.last().unwrap().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn title_commit_saves_but_edit_mode_does_not() {
        let mut f = fixture();
        let id = f.workspace.add_task("draft").unwrap();
        let before = f.gateway.task_saves().len();

        f.workspace.start_edit(id);
        f.workspace.set_edit_buffer(id, "final");
        assert_eq!(f.gateway.task_saves().len(), before);
        assert!(f.workspace.save_edit(id));

        let saves = f.gateway.task_saves();
        assert_eq!(saves.len(), before + 1);
        assert_eq!(saves.last().unwrap()[0].title, "final");
    }

    #[test]
    fn created_note_gets_a_view_and_is_saved() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        assert!(f.workspace.registry().is_open(id));
        assert_eq!(f.host.0.borrow().opened(), 1);
        assert_eq!(f.gateway.note_saves().len(), 1);
    }

    #[test]
    fn quick_edits_persist_one_snapshot_with_final_content() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        let baseline = f.gateway.note_saves().len();

        f.workspace.set_note_content(id, "hi");
        f.clock.advance_ms(200);
        f.workspace.tick();
        f.workspace.set_note_content(id, "hi there");
        f.clock.advance_ms(1000);
        f.workspace.tick();
        f.clock.advance_ms(3000);
        f.workspace.tick();

        let saves = f.gateway.note_saves();
        assert_eq!(saves.len(), baseline + 1);
        assert_eq!(saves.last().unwrap()[0].content, "hi there");
    }

    #[test]
    fn request_close_saves_then_deletes() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        let view = f.workspace.registry().view_for(id).unwrap();
        f.workspace.set_note_content(id, "pending edit");
        let baseline = f.gateway.note_saves().len();

        assert!(f.workspace.request_close(id));

        assert!(f.workspace.note(id).is_none());
        assert!(!f.workspace.registry().is_open(id));
        let saves = f.gateway.note_saves();
        assert_eq!(saves.len(), baseline + 2);
        assert_eq!(saves[baseline][0].content, "pending edit");
        assert!(saves[baseline + 1].is_empty());
        assert_eq!(f.host.0.borrow().calls.last(), Some(&HostCall::Close(view)));

        f.clock.advance_ms(10_000);
        f.workspace.tick();
        assert_eq!(f.gateway.note_saves().len(), baseline + 2);
        assert!(!f.workspace.request_close(id), "stale close is a no-op");
    }

    #[test]
    fn external_close_keeps_the_note() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        let first = f.workspace.registry().view_for(id).unwrap();

        assert!(f.workspace.on_external_view_closed(id));
        assert!(f.workspace.note(id).is_some());
        assert!(!f.workspace.registry().is_open(id));

        let second = f.workspace.open_or_activate(id).unwrap();
        assert_ne!(first, second);
        assert_eq!(f.workspace.open_or_activate(id), Some(second));
        assert_eq!(f.host.0.borrow().opened(), 2);
    }

    #[test]
    fn deleted_note_is_not_resurrected() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        f.workspace.request_close(id);
        assert_eq!(f.workspace.open_or_activate(id), None);
        assert!(f.workspace.registry().is_empty());
    }

    #[test]
    fn single_editor_across_workspace() {
        let mut f = fixture();
        let ids: Vec<TaskId> = ["a", "b", "c"]
            .iter()
            .filter_map(|t| f.workspace.add_task(t))
            .collect();
        for id in &ids {
            f.workspace.start_edit(*id);
        }
        let editing = f.workspace.tasks().iter().filter(|t| t.is_editing).count();
        assert_eq!(editing, 1);
    }

    #[test]
    fn save_failures_do_not_disturb_the_store() {
        let mut f = fixture();
        f.gateway.set_failing(true);
        let id = f.workspace.add_task("still here").unwrap();
        let events = f.workspace.tick();
        assert!(matches!(events.as_slice(), [AutoSaveEvent::Error { .. }]));
        assert!(f.workspace.task(id).is_some());
        assert!(matches!(
            f.workspace.autosave_status(EntityClass::Tasks),
            AutoSaveStatus::Error { .. }
        ));
    }

    #[test]
    fn close_during_status_stage_cancels_the_chain() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        f.workspace.set_note_content(id, "draft");
        f.clock.advance_ms(1000);
        f.workspace.tick();
        assert_eq!(f.workspace.pending_stage(id), Some(NoteStage::ClearStatus));
        assert_eq!(f.workspace.note(id).unwrap().save_status, "Saved ✓");

        assert!(f.workspace.request_close(id));
        assert_eq!(f.workspace.pending_stage(id), None);
        assert_eq!(f.workspace.next_deadline(), None);
        let after_close = f.gateway.note_saves().len();

        f.clock.advance_ms(5000);
        f.workspace.tick();
        assert_eq!(f.gateway.note_saves().len(), after_close);
        assert!(f.workspace.note(id).is_none());
        assert!(f.gateway.note_saves().last().unwrap().is_empty());
    }

    #[test]
    fn non_finite_positions_never_reach_disk() {
        let mut f = fixture();
        f.workspace.create_note_with("important", NoteColor::default());
        let id = f.workspace.create_note();
        let baseline = f.gateway.note_saves().len();

        assert!(!f.workspace.set_note_position(id, f64::NAN, 0.0));
        assert!(!f.workspace.set_note_position(id, f64::NAN, 0.0));
        assert!(!f.workspace.set_note_position(id, 0.0, f64::INFINITY));
        assert_eq!(f.workspace.next_deadline(), None);

        f.workspace.shutdown();
        assert_eq!(f.gateway.note_saves().len(), baseline);
        let note = f.workspace.note(id).unwrap();
        assert!(note.position_x.is_finite() && note.position_y.is_finite());
    }

    #[test]
    fn dropping_the_workspace_writes_pending_note_edits() {
        let f = fixture();
        let gateway = f.gateway.clone();
        let mut workspace = f.workspace;
        let id = workspace.create_note();
        workspace.set_note_content(id, "unsaved");
        let baseline = gateway.note_saves().len();

        drop(workspace);

        let saves = gateway.note_saves();
        assert_eq!(saves.len(), baseline + 1);
        assert_eq!(saves.last().unwrap()[0].content, "unsaved");
    }

    #[test]
    fn shutdown_writes_pending_note_edits() {
        let mut f = fixture();
        let id = f.workspace.create_note();
        f.workspace.set_note_position(id, 42.0, 24.0);
        f.workspace.shutdown();
        let last = f.gateway.note_saves().pop().unwrap();
        assert_eq!((last[0].position_x, last[0].position_y), (42.0, 24.0));
    }

    #[test]
    fn loaded_notes_keep_identity() {
        let mut note = Note::new();
        note.content = "from disk".into();
        let id = note.id;
        let f = fixture_with(RecordingGateway::seeded(Vec::new(), vec![note]));
        assert_eq!(f.workspace.note(id).unwrap().content, "from disk");
        assert!(f.gateway.note_saves().is_empty(), "loading is not a mutation");
    }
}
