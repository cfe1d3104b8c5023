pub mod autosave;
pub mod clock;
pub mod debounce;
pub mod saver;

pub use autosave::{
    save_policy, AutoSaveEvent, AutoSaveSettings, AutoSaveStatus, NoteStage, PersistenceBridge,
    SavePolicy, SAVED_STATUS, SAVING_STATUS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::DebounceScheduler;
pub use saver::{BackgroundSaver, InlineSaver, SaveExecutor, SaveOutcome, SaveRequest};
