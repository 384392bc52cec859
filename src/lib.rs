//! Core of a gamified weekly habit tracker.
//!
//! Tasks carry a 7-slot week of per-day statuses anchored to the most recent
//! Sunday. Recording a status moves a points/level ledger; weekly tallies
//! and a success outlook are derived on demand behind a short-lived cache;
//! reminders fire through an injected notification sink. Persistence is a
//! key-value boundary so embedders choose the medium.
//!
//! The [`store::TaskStore`] is the entry point: construct it over a
//! [`storage::KeyValueStore`] and a [`scheduler::NotificationSink`], call
//! `load()` at startup and `shutdown()` on the way out.

pub mod advisory;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod score;
pub mod stats;
pub mod storage;
pub mod store;
pub mod week;

pub use advisory::{
    AdvisoryClient, MessageTheme, MotivationalMessage, RestAnalysis, TaskPrediction,
    TaskSuggestions,
};
pub use models::{
    DaySlot, DayStatus, Reminder, Score, Task, TaskData, TaskDraft, TaskPatch, Timestamp,
};
pub use scheduler::{DismissHandle, LogSink, NotificationSink, ReminderScheduler};
pub use score::ScoreLedger;
pub use stats::{PredictionStats, StatsEngine, TaskStats};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::TaskStore;
