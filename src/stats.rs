use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use crate::models::{DayStatus, Task, Timestamp, DAYS_PER_WEEK};
use crate::week;

/// Weekly tallies are recomputed at most once per second unless invalidated.
pub const STATS_CACHE_TTL: Duration = Duration::from_millis(1000);

const RECENT_STATUS_WINDOW: usize = 10;
const LEVEL_BONUS_STEP: i64 = 5;
const LEVEL_BONUS_CAP: i64 = 25;
const CONSISTENCY_SCALE: f64 = 0.15;
const CONSISTENCY_CAP: f64 = 15.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DayTally {
    pub date: Timestamp,
    pub completed: u32,
    pub failed: u32,
    #[serde(rename = "break")]
    pub breaks: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TotalTally {
    pub completed: u32,
    pub failed: u32,
    #[serde(rename = "break")]
    pub breaks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskStats {
    pub weekly: Vec<DayTally>,
    pub total: TotalTally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PredictionStats {
    pub overall_success_rate: i64,
    pub level_bonus: i64,
    pub consistency_bonus: i64,
    pub adjusted_success_rate: i64,
}

/// Derives weekly/aggregate tallies from task records, holding a short-lived
/// cache that the owning store invalidates on structural mutations.
#[derive(Default)]
pub struct StatsEngine {
    cache: Mutex<Option<CachedStats>>,
}

struct CachedStats {
    stats: TaskStats,
    computed_at: Instant,
}

impl StatsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        *self.cache.lock().expect("stats cache poisoned") = None;
    }

    pub fn task_stats(&self, tasks: &[Task]) -> TaskStats {
        self.task_stats_with_ttl(tasks, STATS_CACHE_TTL)
    }

    fn task_stats_with_ttl(&self, tasks: &[Task], ttl: Duration) -> TaskStats {
        let mut cache = self.cache.lock().expect("stats cache poisoned");
        if let Some(cached) = cache.as_ref() {
            if cached.computed_at.elapsed() < ttl {
                return cached.stats.clone();
            }
        }
        let stats = compute_stats(tasks);
        *cache = Some(CachedStats {
            stats: stats.clone(),
            computed_at: Instant::now(),
        });
        stats
    }

    /// Approximate success outlook for the current task set. `None` when
    /// there is nothing to predict from.
    pub fn prediction_stats(&self, tasks: &[Task], level: i64) -> Option<PredictionStats> {
        if tasks.is_empty() {
            return None;
        }

        let stats = self.task_stats(tasks);
        let completed = f64::from(stats.total.completed);
        let failed = f64::from(stats.total.failed);
        let success_rate = if completed + failed == 0.0 {
            0.0
        } else {
            completed / (completed + failed) * 100.0
        };

        let level_bonus = (level * LEVEL_BONUS_STEP).min(LEVEL_BONUS_CAP);
        let consistency_bonus = consistency_bonus(tasks);
        let adjusted =
            (success_rate + level_bonus as f64 + consistency_bonus as f64).min(100.0);

        Some(PredictionStats {
            overall_success_rate: success_rate.round() as i64,
            level_bonus,
            consistency_bonus,
            adjusted_success_rate: adjusted.round() as i64,
        })
    }
}

/// Tallies by slot position, not by matching dates: tasks anchored to an
/// older week still land in the bucket of their slot index.
fn compute_stats(tasks: &[Task]) -> TaskStats {
    let anchor = week::week_start(Utc::now());
    let mut weekly: Vec<DayTally> = (0..DAYS_PER_WEEK as i64)
        .map(|offset| DayTally {
            date: week::day_start(anchor + chrono::Duration::days(offset)),
            ..DayTally::default()
        })
        .collect();

    for task in tasks {
        for (index, slot) in task.weekly_status.iter().enumerate().take(DAYS_PER_WEEK) {
            let Some(status) = slot.status else { continue };
            let tally = &mut weekly[index];
            match status {
                DayStatus::Complete => tally.completed += 1,
                DayStatus::Failed => tally.failed += 1,
                DayStatus::Break => tally.breaks += 1,
            }
        }
    }

    let total = weekly.iter().fold(TotalTally::default(), |acc, day| TotalTally {
        completed: acc.completed + day.completed,
        failed: acc.failed + day.failed,
        breaks: acc.breaks + day.breaks,
    });

    TaskStats { weekly, total }
}

/// Fraction of the last 10 recorded day statuses (encounter order across all
/// tasks) that are complete, scaled to an up-to-15-point bonus.
fn consistency_bonus(tasks: &[Task]) -> i64 {
    let recent: Vec<DayStatus> = tasks
        .iter()
        .flat_map(|task| task.weekly_status.iter())
        .filter_map(|slot| slot.status)
        .collect();
    let window = &recent[recent.len().saturating_sub(RECENT_STATUS_WINDOW)..];
    if window.is_empty() {
        return 0;
    }

    let successful = window
        .iter()
        .filter(|status| matches!(status, DayStatus::Complete))
        .count();
    let rate = successful as f64 / window.len() as f64 * 100.0;
    (rate * CONSISTENCY_SCALE).min(CONSISTENCY_CAP).round() as i64
}
