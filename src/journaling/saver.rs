use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use time::OffsetDateTime;

use crate::model::{Note, Task};
use crate::storage::StorageGateway;
use crate::store::EntityClass;

/// A full snapshot of one entity class, ready to be written.
#[derive(Debug, Clone)]
pub enum SaveRequest {
    Tasks(Vec<Task>),
    Notes(Vec<Note>),
}

impl SaveRequest {
    pub fn class(&self) -> EntityClass {
        match self {
            SaveRequest::Tasks(_) => EntityClass::Tasks,
            SaveRequest::Notes(_) => EntityClass::Notes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub class: EntityClass,
    pub finished_at: OffsetDateTime,
    pub result: std::result::Result<(), String>,
    /// Older queued snapshots of the same class dropped in favour of this one.
    pub superseded: usize,
}

/// Runs gateway writes on behalf of the interactive loop.
pub trait SaveExecutor {
    fn submit(&mut self, request: SaveRequest);
    /// Outcomes that finished since the last call. Never blocks.
    fn drain(&mut self) -> Vec<SaveOutcome>;
    /// Waits for every submitted request to finish and returns the remaining
    /// outcomes. Further submissions are ignored.
    fn shutdown(&mut self) -> Vec<SaveOutcome>;
}

fn write<G: StorageGateway + ?Sized>(
    gateway: &G,
    request: &SaveRequest,
    superseded: usize,
) -> SaveOutcome {
    let result = match request {
        SaveRequest::Tasks(tasks) => gateway.save_tasks(tasks),
        SaveRequest::Notes(notes) => gateway.save_notes(notes),
    };
    SaveOutcome {
        class: request.class(),
        finished_at: OffsetDateTime::now_utc(),
        result: result.map_err(|err| err.to_string()),
        superseded,
    }
}

/// Writes synchronously on the caller's thread.
pub struct InlineSaver<G> {
    gateway: G,
    outcomes: Vec<SaveOutcome>,
}

impl<G: StorageGateway> InlineSaver<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            outcomes: Vec::new(),
        }
    }
}

impl<G: StorageGateway> SaveExecutor for InlineSaver<G> {
    fn submit(&mut self, request: SaveRequest) {
        let outcome = write(&self.gateway, &request, 0);
        self.outcomes.push(outcome);
    }

    fn drain(&mut self) -> Vec<SaveOutcome> {
        std::mem::take(&mut self.outcomes)
    }

    fn shutdown(&mut self) -> Vec<SaveOutcome> {
        self.drain()
    }
}

/// Writes on a dedicated thread. Requests queued while a write is in
/// progress are coalesced so only the newest snapshot per class is written.
pub struct BackgroundSaver {
    requests: Option<Sender<SaveRequest>>,
    outcomes: Receiver<SaveOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundSaver {
    pub fn spawn<G: StorageGateway>(gateway: G) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<SaveRequest>();
        let (outcome_tx, outcome_rx) = unbounded::<SaveOutcome>();
        let worker = thread::Builder::new()
            .name("tasknotes-saver".into())
            .spawn(move || run_worker(gateway, request_rx, outcome_tx))
            .context("spawning save worker thread")?;
        Ok(Self {
            requests: Some(request_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
        })
    }
}

fn run_worker<G: StorageGateway>(
    gateway: G,
    requests: Receiver<SaveRequest>,
    outcomes: Sender<SaveOutcome>,
) {
    while let Ok(first) = requests.recv() {
        let mut tasks: Option<SaveRequest> = None;
        let mut notes: Option<SaveRequest> = None;
        let mut superseded_tasks = 0;
        let mut superseded_notes = 0;
        for request in std::iter::once(first).chain(requests.try_iter()) {
            let (slot, superseded) = match request.class() {
                EntityClass::Tasks => (&mut tasks, &mut superseded_tasks),
                EntityClass::Notes => (&mut notes, &mut superseded_notes),
            };
            if slot.replace(request).is_some() {
                *superseded += 1;
            }
        }
        for (request, superseded) in [(tasks, superseded_tasks), (notes, superseded_notes)] {
            let Some(request) = request else {
                continue;
            };
            if superseded > 0 {
                tracing::debug!(class = ?request.class(), superseded, "coalesced queued snapshots");
            }
            let outcome = write(&gateway, &request, superseded);
            if outcomes.send(outcome).is_err() {
                tracing::debug!("save outcome receiver dropped");
            }
        }
    }
    tracing::debug!("save worker exiting");
}

impl SaveExecutor for BackgroundSaver {
    fn submit(&mut self, request: SaveRequest) {
        let Some(requests) = &self.requests else {
            tracing::warn!(class = ?request.class(), "save submitted after shutdown, dropping");
            return;
        };
        if requests.send(request).is_err() {
            tracing::error!("save worker is gone; snapshot not written");
        }
    }

    fn drain(&mut self) -> Vec<SaveOutcome> {
        self.outcomes.try_iter().collect()
    }

    fn shutdown(&mut self) -> Vec<SaveOutcome> {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("save worker panicked");
            }
        }
        self.drain()
    }
}

impl Drop for BackgroundSaver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::RecordingGateway;
    use crate::storage::StorageResult;

    #[test]
    fn inline_saver_reports_each_write() {
        let gateway = RecordingGateway::default();
        let mut saver = InlineSaver::new(gateway.clone());
        saver.submit(SaveRequest::Tasks(vec![Task::new("a")]));
        saver.submit(SaveRequest::Notes(vec![Note::new()]));
        let outcomes = saver.drain();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(gateway.task_saves().len(), 1);
        assert_eq!(gateway.note_saves().len(), 1);
        assert!(saver.drain().is_empty());
    }

    #[test]
    fn inline_saver_surfaces_failures_as_outcomes() {
        let gateway = RecordingGateway::default();
        gateway.set_failing(true);
        let mut saver = InlineSaver::new(gateway);
        saver.submit(SaveRequest::Tasks(Vec::new()));
        let outcomes = saver.drain();
        assert!(outcomes[0].result.as_ref().unwrap_err().contains("disk unavailable"));
    }

    /// Blocks inside the first task save until released.
    struct GatedGateway {
        inner: RecordingGateway,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl StorageGateway for GatedGateway {
        fn load_tasks(&self) -> StorageResult<Vec<Task>> {
            Ok(Vec::new())
        }

        fn save_tasks(&self, tasks: &[Task]) -> StorageResult<()> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            self.inner.save_tasks(tasks)
        }

        fn load_notes(&self) -> StorageResult<Vec<Note>> {
            Ok(Vec::new())
        }

        fn save_notes(&self, notes: &[Note]) -> StorageResult<()> {
            self.inner.save_notes(notes)
        }
    }

    #[test]
    fn background_saver_writes_latest_queued_snapshot() -> anyhow::Result<()> {
        let recorder = RecordingGateway::default();
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let mut saver = BackgroundSaver::spawn(GatedGateway {
            inner: recorder.clone(),
            entered: entered_tx,
            release: release_rx,
        })?;

        saver.submit(SaveRequest::Tasks(vec![Task::new("first")]));
        entered_rx.recv()?;
        saver.submit(SaveRequest::Tasks(vec![Task::new("second")]));
        saver.submit(SaveRequest::Tasks(vec![Task::new("third")]));
        saver.submit(SaveRequest::Notes(vec![Note::new()]));
        for _ in 0..2 {
            release_tx.send(())?;
        }

        let outcomes = saver.shutdown();
        let written: Vec<String> = recorder
            .task_saves()
            .iter()
            .map(|snapshot| snapshot[0].title.clone())
            .collect();
        assert_eq!(written, vec!["first", "third"]);
        assert_eq!(recorder.note_saves().len(), 1);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().any(|o| o.superseded == 1));
        Ok(())
    }
}
