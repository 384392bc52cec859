use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::models::{
    DayStatus, Reminder, Score, Task, TaskData, TaskDraft, TaskPatch, Timestamp,
};
use crate::scheduler::{NotificationSink, ReminderScheduler};
use crate::score::{self, ScoreLedger};
use crate::stats::{PredictionStats, StatsEngine, TaskStats};
use crate::storage::KeyValueStore;
use crate::week;

pub const TASK_DATA_KEY: &str = "taskData";
pub const REMINDERS_KEY: &str = "reminders";

/// Quiet period for coalescing bursts of day-status writes.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Owns the task collection, the score ledger, and the reminder records.
/// Cloning yields another handle onto the same state.
///
/// Mutations are synchronous: readers observe a day-status change
/// immediately even though the matching write-back may still be pending in
/// the debounce window. No operation raises; unknown ids and out-of-window
/// dates degrade to no-ops and storage failures are logged and absorbed.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<StoreData>>,
    storage: Arc<dyn KeyValueStore>,
    scheduler: Arc<ReminderScheduler>,
    stats: Arc<StatsEngine>,
    pending_save: Arc<Mutex<Option<JoinHandle<()>>>>,
}

#[derive(Default)]
struct StoreData {
    tasks: Vec<Task>,
    ledger: ScoreLedger,
    reminders: Vec<Reminder>,
}

impl TaskStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreData::default())),
            storage,
            scheduler: Arc::new(ReminderScheduler::new(sink)),
            stats: Arc::new(StatsEngine::new()),
            pending_save: Arc::new(Mutex::new(None)),
        }
    }

    /// Restores tasks, score, and reminders from storage, then re-arms a
    /// timer for every reminder still in the future. Missing or malformed
    /// documents fall back to an empty collection and a zeroed ledger.
    pub fn load(&self) {
        let data: TaskData = self.read_document(TASK_DATA_KEY).unwrap_or_default();
        let reminders: Vec<Reminder> = self.read_document(REMINDERS_KEY).unwrap_or_default();
        {
            let mut guard = self.lock();
            guard.tasks = data.tasks;
            guard.ledger = ScoreLedger::restore(data.points, data.level);
            guard.reminders = reminders.clone();
        }
        self.stats.invalidate();
        self.scheduler.initialize(&reminders);
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn score(&self) -> Score {
        self.lock().ledger.score()
    }

    /// Creates a task with a fresh week of slots anchored to the current
    /// Sunday and persists immediately.
    pub fn add_task(&self, draft: TaskDraft) -> Task {
        let now = Utc::now();
        let slots = week::build_slots(week::week_start(now));
        let task = {
            let mut guard = self.lock();
            let id = unique_timestamp_id(
                |candidate| guard.tasks.iter().any(|t| t.id == candidate),
                now.timestamp_millis(),
            );
            let task = Task {
                id,
                title: draft.title,
                notes: draft.notes,
                weekly_status: slots,
                created_at: now.timestamp(),
                updated_at: None,
                completed: false,
                completed_at: None,
                failed: false,
                failed_at: None,
                on_break: false,
                break_started_at: None,
            };
            guard.tasks.push(task.clone());
            task
        };
        self.flush_tasks();
        task
    }

    /// Records a status for one of the task's day slots and moves the ledger
    /// by the difference: any previous status is reversed before the new one
    /// is applied, so a day only ever contributes its final status.
    ///
    /// Silently ignored when the task is unknown, the index is out of range,
    /// or the slot's date is still in the future. The in-memory change is
    /// visible immediately; the write-back is debounced.
    pub fn update_day_status(
        &self,
        task_id: &str,
        day_index: usize,
        status: Option<DayStatus>,
    ) {
        let now = Utc::now().timestamp();
        {
            let mut guard = self.lock();
            let StoreData { tasks, ledger, .. } = &mut *guard;
            let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
                return;
            };
            let Some(slot) = task.weekly_status.get_mut(day_index) else {
                return;
            };
            if slot.date > now {
                return;
            }

            if let Some(previous) = slot.status {
                ledger.apply(-score::status_points(previous));
            }
            slot.status = status;
            if let Some(next) = status {
                ledger.apply(score::status_points(next));
            }
        }
        self.request_save();
    }

    /// Removes the task and takes back the points its recorded week
    /// contributed. Persists immediately and always invalidates the stats
    /// cache, found or not.
    pub fn delete_task(&self, task_id: &str) {
        {
            let mut guard = self.lock();
            let StoreData { tasks, ledger, .. } = &mut *guard;
            if let Some(task) = tasks.iter().find(|t| t.id == task_id) {
                ledger.revoke(-score::weekly_contribution(&task.weekly_status));
            }
            tasks.retain(|t| t.id != task_id);
        }
        self.flush_tasks();
        self.stats.invalidate();
    }

    /// Merges the patch into the task and stamps `updated_at`. Returns the
    /// updated record, or `None` (without persisting) when the id is
    /// unknown.
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> Option<Task> {
        let updated = {
            let mut guard = self.lock();
            let task = guard.tasks.iter_mut().find(|t| t.id == task_id)?;
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(notes) = patch.notes {
                task.notes = Some(notes);
            }
            task.updated_at = Some(Utc::now().timestamp());
            task.clone()
        };
        self.flush_tasks();
        Some(updated)
    }

    /// Marks the whole task complete. Independent of day-slot tracking.
    pub fn mark_task_complete(&self, task_id: &str) {
        let now = Utc::now().timestamp();
        let found = {
            let mut guard = self.lock();
            match guard.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.completed = true;
                    task.completed_at = Some(now);
                    true
                }
                None => false,
            }
        };
        if found {
            self.flush_tasks();
        }
    }

    /// Marks the whole task failed, clearing the completed flag.
    pub fn mark_task_failed(&self, task_id: &str) {
        let now = Utc::now().timestamp();
        let found = {
            let mut guard = self.lock();
            match guard.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.failed = true;
                    task.completed = false;
                    task.failed_at = Some(now);
                    true
                }
                None => false,
            }
        };
        if found {
            self.flush_tasks();
        }
    }

    /// Toggles the task's break state; entering a break stamps its start,
    /// leaving one clears it.
    pub fn mark_task_break(&self, task_id: &str) {
        let now = Utc::now().timestamp();
        let found = {
            let mut guard = self.lock();
            match guard.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.on_break = !task.on_break;
                    task.break_started_at = task.on_break.then_some(now);
                    true
                }
                None => false,
            }
        };
        if found {
            self.flush_tasks();
        }
    }

    /// Replaces every task's slots with a fresh set anchored to the current
    /// week. The discarded statuses vanish without a ledger adjustment; the
    /// points they earned stay. Invalidates the stats cache and persists
    /// immediately.
    pub fn start_new_week(&self) -> Vec<Task> {
        let anchor = week::week_start(Utc::now());
        let tasks = {
            let mut guard = self.lock();
            for task in &mut guard.tasks {
                task.weekly_status = week::build_slots(anchor);
            }
            guard.tasks.clone()
        };
        self.stats.invalidate();
        self.flush_tasks();
        tasks
    }

    pub fn task_stats(&self) -> TaskStats {
        self.stats.task_stats(&self.tasks())
    }

    pub fn prediction_stats(&self) -> Option<PredictionStats> {
        let (tasks, level) = {
            let guard = self.lock();
            (guard.tasks.clone(), guard.ledger.level())
        };
        self.stats.prediction_stats(&tasks, level)
    }

    /// Creates a reminder snapshotting the task's current title, persists
    /// it, and arms its timer when the time is still in the future. Returns
    /// `None` without side effects when the task is unknown.
    pub fn add_reminder(
        &self,
        task_id: &str,
        time: Timestamp,
        message: &str,
    ) -> Option<Reminder> {
        let reminder = {
            let mut guard = self.lock();
            let title = guard
                .tasks
                .iter()
                .find(|t| t.id == task_id)?
                .title
                .clone();
            let id = unique_timestamp_id(
                |candidate| guard.reminders.iter().any(|r| r.id == candidate),
                Utc::now().timestamp_millis(),
            );
            let reminder = Reminder {
                id,
                task_id: task_id.to_string(),
                task_title: title,
                time,
                message: message.to_string(),
            };
            guard.reminders.push(reminder.clone());
            reminder
        };
        self.save_reminders();
        self.scheduler.arm(reminder.clone());
        Some(reminder)
    }

    /// Removes the record and persists. An already-armed timer keeps running
    /// and may still fire against the snapshot it captured.
    pub fn delete_reminder(&self, reminder_id: &str) {
        self.lock().reminders.retain(|r| r.id != reminder_id);
        self.save_reminders();
    }

    /// All reminders, or only those attached to `task_id`.
    pub fn reminders(&self, task_id: Option<&str>) -> Vec<Reminder> {
        let guard = self.lock();
        match task_id {
            Some(task_id) => guard
                .reminders
                .iter()
                .filter(|r| r.task_id == task_id)
                .cloned()
                .collect(),
            None => guard.reminders.clone(),
        }
    }

    /// Cancels any pending debounced write and persists everything now.
    pub fn flush(&self) {
        self.flush_tasks();
        self.save_reminders();
    }

    /// Cancels reminder timers and forces a final write.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.flush();
    }

    /// Coalesces rapid successive calls: the write happens after a quiet
    /// period, and a newer request supersedes the pending one. Outside an
    /// async runtime the write happens inline instead.
    fn request_save(&self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.save_task_data();
                return;
            }
        };

        let store = self.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(SAVE_DEBOUNCE).await;
            store.save_task_data();
        });
        let mut pending = self.pending_save.lock().expect("pending save poisoned");
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    fn flush_tasks(&self) {
        if let Some(handle) = self
            .pending_save
            .lock()
            .expect("pending save poisoned")
            .take()
        {
            handle.abort();
        }
        self.save_task_data();
    }

    fn save_task_data(&self) {
        let document = {
            let guard = self.lock();
            TaskData {
                tasks: guard.tasks.clone(),
                level: guard.ledger.level(),
                points: guard.ledger.points(),
            }
        };
        self.write_document(TASK_DATA_KEY, &document);
    }

    fn save_reminders(&self) {
        let reminders = self.lock().reminders.clone();
        self.write_document(REMINDERS_KEY, &reminders);
    }

    fn read_document<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("storage read failed key={key}: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("malformed document key={key}: {err}");
                None
            }
        }
    }

    fn write_document<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("serialize failed key={key}: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.set(key, &raw) {
            log::warn!("storage write failed key={key}: {err}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.inner.lock().expect("store state poisoned")
    }
}

/// Millisecond-timestamp id, bumped past collisions from same-instant
/// creation.
fn unique_timestamp_id<F: Fn(&str) -> bool>(taken: F, base: i64) -> String {
    let mut candidate = base;
    loop {
        let id = candidate.to_string();
        if !taken(&id) {
            return id;
        }
        candidate += 1;
    }
}
