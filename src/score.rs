use crate::models::{DaySlot, DayStatus, Score};

pub const POINTS_PER_LEVEL: i64 = 100;
pub const LEVEL_UP_BONUS: i64 = 50;

/// Points awarded (or charged) when a day slot takes `status`.
pub fn status_points(status: DayStatus) -> i64 {
    match status {
        DayStatus::Complete => 10,
        DayStatus::Failed => -5,
        DayStatus::Break => 2,
    }
}

/// Net points a task's recorded week currently contributes to the ledger.
pub fn weekly_contribution(slots: &[DaySlot]) -> i64 {
    slots
        .iter()
        .filter_map(|slot| slot.status)
        .map(status_points)
        .sum()
}

/// Points/level accumulator. Points never go negative and the level is always
/// derived as `points / 100`, never stored as independent truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    points: i64,
    level: i64,
}

impl ScoreLedger {
    pub fn restore(points: i64, level: i64) -> Self {
        Self { points, level }
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    pub fn score(&self) -> Score {
        Score {
            points: self.points,
            level: self.level,
        }
    }

    /// Applies a point delta, clamping at zero, and re-derives the level.
    /// Crossing a level boundary awards a one-time +50 bonus; the bonus is a
    /// single pass and is not itself run through the level check again.
    pub fn apply(&mut self, delta: i64) {
        self.points = (self.points + delta).max(0);
        let previous = self.level;
        self.level = self.points / POINTS_PER_LEVEL;
        if self.level > previous {
            self.points += LEVEL_UP_BONUS;
        }
    }

    /// Removes a deleted task's contribution: clamp at zero and re-derive the
    /// level, with no bonus on this path.
    pub fn revoke(&mut self, delta: i64) {
        self.points = (self.points + delta).max(0);
        self.level = self.points / POINTS_PER_LEVEL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_points_and_reversal_are_exact_negations() {
        assert_eq!(status_points(DayStatus::Complete), 10);
        assert_eq!(status_points(DayStatus::Failed), -5);
        assert_eq!(status_points(DayStatus::Break), 2);
    }

    #[test]
    fn points_never_go_negative() {
        let mut ledger = ScoreLedger::default();
        ledger.apply(-5);
        assert_eq!(ledger.points(), 0);
        assert_eq!(ledger.level(), 0);

        ledger.apply(10);
        ledger.apply(-25);
        assert_eq!(ledger.points(), 0);
    }

    #[test]
    fn level_is_derived_from_points() {
        let mut ledger = ScoreLedger::default();
        for _ in 0..9 {
            ledger.apply(10);
        }
        assert_eq!(ledger.points(), 90);
        assert_eq!(ledger.level(), 0);

        ledger.apply(10);
        // 100 points crosses level 1 and banks the bonus on top.
        assert_eq!(ledger.level(), 1);
        assert_eq!(ledger.points(), 150);
    }

    #[test]
    fn level_up_bonus_is_awarded_once_per_crossing() {
        let mut ledger = ScoreLedger::restore(95, 0);
        ledger.apply(10);
        assert_eq!(ledger.points(), 155);
        assert_eq!(ledger.level(), 1);

        // Staying inside the level pays no further bonus.
        ledger.apply(10);
        assert_eq!(ledger.points(), 165);
        assert_eq!(ledger.level(), 1);
    }

    #[test]
    fn bonus_is_not_cascaded_within_one_call() {
        // 99 + 99 = 198 derives level 1; the +50 bonus lands the points at
        // 248 but the level stays at the single-pass value until the next
        // delta is applied.
        let mut ledger = ScoreLedger::restore(99, 0);
        ledger.apply(99);
        assert_eq!(ledger.points(), 248);
        assert_eq!(ledger.level(), 1);
    }

    #[test]
    fn reversal_of_a_failed_day_can_level_up() {
        // Reversing a -5 adds points back and may cross a boundary like any
        // other positive delta.
        let mut ledger = ScoreLedger::restore(98, 0);
        ledger.apply(-status_points(DayStatus::Failed));
        assert_eq!(ledger.points(), 153);
        assert_eq!(ledger.level(), 1);
    }

    #[test]
    fn revoke_recomputes_level_without_bonus() {
        let mut ledger = ScoreLedger::restore(150, 1);
        ledger.revoke(-60);
        assert_eq!(ledger.points(), 90);
        assert_eq!(ledger.level(), 0);

        // Clamped at zero even when the contribution exceeds the balance.
        ledger.revoke(-500);
        assert_eq!(ledger.points(), 0);
        assert_eq!(ledger.level(), 0);

        // A positive revoke (net-negative week deleted) pays no bonus.
        let mut ledger = ScoreLedger::restore(95, 0);
        ledger.revoke(10);
        assert_eq!(ledger.points(), 105);
        assert_eq!(ledger.level(), 1);
    }

    #[test]
    fn weekly_contribution_sums_only_recorded_days() {
        let slots = vec![
            DaySlot { date: 0, status: Some(DayStatus::Complete) },
            DaySlot { date: 1, status: None },
            DaySlot { date: 2, status: Some(DayStatus::Failed) },
            DaySlot { date: 3, status: Some(DayStatus::Break) },
        ];
        assert_eq!(weekly_contribution(&slots), 10 - 5 + 2);
        assert_eq!(weekly_contribution(&[]), 0);
    }
}
