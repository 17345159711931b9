//! Stats calculator.
//!
//! `calculate_stats` is pure: the same profile and instant always produce the
//! same snapshot. It does not validate the profile; callers reject
//! non-positive habit fields at the edit boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::habit::{Currency, HabitProfile};
use super::milestones::{MilestoneState, MilestoneTable};

/// Minutes of life attributed to each cigarette not smoked.
pub const MINUTES_PER_CIGARETTE: u64 = 11;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Whole-unit breakdown of the time since quitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeSinceQuit {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeSinceQuit {
    /// Floor decomposition; no month/year folding
    pub fn from_millis(elapsed_ms: u64) -> Self {
        let total_seconds = elapsed_ms / 1000;
        Self {
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        }
    }
}

/// Everything the dashboard shows for one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub time_since_quit: TimeSinceQuit,
    pub cigarettes_not_smoked: u64,
    pub money_saved: f64,
    pub lifetime_regained_minutes: u64,
    pub current_milestone: Option<MilestoneState>,
    pub next_milestone: Option<MilestoneState>,
    /// Fractional hours used for milestone progress
    pub elapsed_hours: f64,
    pub achieved_count: usize,
    pub milestone_count: usize,
    pub currency: Currency,
    pub calculated_at: DateTime<Utc>,
}

impl StatsSnapshot {
    pub fn formatted_elapsed(&self) -> String {
        format_elapsed(&self.time_since_quit)
    }

    pub fn formatted_money(&self) -> String {
        format_money(self.money_saved, self.currency)
    }

    pub fn formatted_lifetime(&self) -> String {
        format_lifetime(self.lifetime_regained_minutes)
    }
}

/// Derive a snapshot using the standard milestone table.
pub fn calculate_stats(habit: &HabitProfile, now: DateTime<Utc>) -> StatsSnapshot {
    calculate_stats_with(&MilestoneTable::standard(), habit, now)
}

/// Derive a snapshot against a specific milestone table.
pub fn calculate_stats_with(
    table: &MilestoneTable,
    habit: &HabitProfile,
    now: DateTime<Utc>,
) -> StatsSnapshot {
    // quit_date in the future (clock skew) behaves like "just quit"
    let elapsed_ms = (now - habit.quit_date).num_milliseconds().max(0) as u64;
    let elapsed_hours = elapsed_ms as f64 / MS_PER_HOUR;

    let cigarettes_per_hour = habit.cigarettes_per_day / 24.0;
    let cigarettes_not_smoked = (cigarettes_per_hour * elapsed_hours).floor().max(0.0) as u64;

    // staircase: follows the floored count, not elapsed time
    let money_saved = cigarettes_not_smoked as f64 * habit.price_per_cigarette();

    let milestones = table.current_and_next(elapsed_hours);

    StatsSnapshot {
        time_since_quit: TimeSinceQuit::from_millis(elapsed_ms),
        cigarettes_not_smoked,
        money_saved,
        lifetime_regained_minutes: cigarettes_not_smoked * MINUTES_PER_CIGARETTE,
        current_milestone: milestones.current,
        next_milestone: milestones.next,
        elapsed_hours,
        achieved_count: table.achieved_count(elapsed_hours),
        milestone_count: table.len(),
        currency: habit.currency,
        calculated_at: now,
    }
}

/// `"3d 4h 5m"`, `"4h 5m 6s"`, `"5m 6s"` or `"6s"`.
pub fn format_elapsed(time: &TimeSinceQuit) -> String {
    if time.days > 0 {
        format!("{}d {}h {}m", time.days, time.hours, time.minutes)
    } else if time.hours > 0 {
        format!("{}h {}m {}s", time.hours, time.minutes, time.seconds)
    } else if time.minutes > 0 {
        format!("{}m {}s", time.minutes, time.seconds)
    } else {
        format!("{}s", time.seconds)
    }
}

pub fn format_money(amount: f64, currency: Currency) -> String {
    format!("{}{:.2}", currency.symbol(), amount)
}

/// `"45 min"`, `"3h 20m"` or `"2d 5h"`.
pub fn format_lifetime(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h {}m", hours, minutes % 60);
    }
    format!("{}d {}h", hours / 24, hours % 24)
}
