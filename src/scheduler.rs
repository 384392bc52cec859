use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::models::Reminder;

/// How long a delivered notification stays up before it is dismissed for the
/// user.
pub const AUTO_DISMISS: Duration = Duration::from_secs(30);

/// Control for a displayed notification. Implementations must tolerate
/// `dismiss` on an already-removed panel.
pub trait DismissHandle: Send {
    fn dismiss(&mut self);
}

/// Injected notification surface. Delivery has no return value the core
/// consumes beyond the dismiss control, and must not touch task state.
pub trait NotificationSink: Send + Sync {
    fn display(&self, reminder: &Reminder) -> Box<dyn DismissHandle>;
}

/// Sink that only logs. Useful for headless embedders.
pub struct LogSink;

struct LoggedDismiss(Option<String>);

impl DismissHandle for LoggedDismiss {
    fn dismiss(&mut self) {
        if let Some(id) = self.0.take() {
            log::debug!("reminder dismissed id={id}");
        }
    }
}

impl NotificationSink for LogSink {
    fn display(&self, reminder: &Reminder) -> Box<dyn DismissHandle> {
        log::info!(
            "reminder id={} task={} message={}",
            reminder.id,
            reminder.task_title,
            reminder.message
        );
        Box::new(LoggedDismiss(Some(reminder.id.clone())))
    }
}

/// Arms one timer per pending reminder and delivers to the sink when it
/// elapses. Owns only the timer handles; the reminder records live in the
/// task store.
pub struct ReminderScheduler {
    sink: Arc<dyn NotificationSink>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Clears any armed timers, then re-arms one per reminder whose time is
    /// still in the future. Reminders already in the past are dropped
    /// without firing.
    pub fn initialize(&self, reminders: &[Reminder]) {
        self.shutdown();
        for reminder in reminders {
            self.arm(reminder.clone());
        }
    }

    /// Arms a timer that fires once at `reminder.time`, shows the
    /// notification, and dismisses it after [`AUTO_DISMISS`]. Past-due
    /// reminders are ignored.
    pub fn arm(&self, reminder: Reminder) {
        let delay = reminder.time - Utc::now().timestamp();
        if delay <= 0 {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("no async runtime; reminder id={} will not fire", reminder.id);
                return;
            }
        };

        let sink = Arc::clone(&self.sink);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay as u64)).await;
            log::debug!("reminder fired id={} task={}", reminder.id, reminder.task_id);
            let mut dismiss = sink.display(&reminder);
            tokio::time::sleep(AUTO_DISMISS).await;
            dismiss.dismiss();
        });
        self.timers.lock().expect("timer list poisoned").push(handle);
    }

    /// Cancels every armed timer. Idempotent.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().expect("timer list poisoned");
        for handle in timers.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSink {
        fired: Mutex<Vec<String>>,
        dismissed: Arc<AtomicUsize>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: Mutex::new(Vec::new()),
                dismissed: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn fired_ids(&self) -> Vec<String> {
            self.fired.lock().unwrap().clone()
        }
    }

    struct CountingDismiss {
        dismissed: Arc<AtomicUsize>,
        done: bool,
    }

    impl DismissHandle for CountingDismiss {
        fn dismiss(&mut self) {
            if !self.done {
                self.done = true;
                self.dismissed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl NotificationSink for RecordingSink {
        fn display(&self, reminder: &Reminder) -> Box<dyn DismissHandle> {
            self.fired.lock().unwrap().push(reminder.id.clone());
            Box::new(CountingDismiss {
                dismissed: Arc::clone(&self.dismissed),
                done: false,
            })
        }
    }

    fn reminder(id: &str, time: i64) -> Reminder {
        Reminder {
            id: id.to_string(),
            task_id: "t1".to_string(),
            task_title: "task".to_string(),
            time,
            message: "go".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn future_reminder_fires_exactly_once() {
        let sink = RecordingSink::new();
        let scheduler = ReminderScheduler::new(sink.clone());
        scheduler.arm(reminder("r1", Utc::now().timestamp() + 300));

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(sink.fired_ids().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.fired_ids(), vec!["r1".to_string()]);

        // No repeat firing, and the auto-dismiss lands after 30s.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sink.fired_ids(), vec!["r1".to_string()]);
        assert_eq!(sink.dismissed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn past_reminder_never_fires() {
        let sink = RecordingSink::new();
        let scheduler = ReminderScheduler::new(sink.clone());
        scheduler.initialize(&[reminder("old", Utc::now().timestamp() - 10)]);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(sink.fired_ids().is_empty());
        drop(scheduler);
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_replaces_previously_armed_timers() {
        let sink = RecordingSink::new();
        let scheduler = ReminderScheduler::new(sink.clone());
        let now = Utc::now().timestamp();
        scheduler.arm(reminder("stale", now + 60));

        scheduler.initialize(&[reminder("fresh", now + 120)]);

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(sink.fired_ids(), vec!["fresh".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_armed_timers_and_is_idempotent() {
        let sink = RecordingSink::new();
        let scheduler = ReminderScheduler::new(sink.clone());
        scheduler.arm(reminder("r1", Utc::now().timestamp() + 60));

        scheduler.shutdown();
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(sink.fired_ids().is_empty());
    }
}
