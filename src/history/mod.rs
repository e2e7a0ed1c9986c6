//! Prediction history
//!
//! Records are saved only for signed-in users and only as a separate,
//! best-effort step after a prediction has been shown.

pub mod envelope;
pub mod recorder;
pub mod types;

pub use envelope::{extract_entries, normalize_entries, normalize_entry};
pub use recorder::{record_best_effort, HistoryRecorder, SaveOutcome};
pub use types::{HistoryEntry, HistoryEntryInput};
