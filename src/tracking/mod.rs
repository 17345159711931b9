//! Quit tracking: habit profile, milestone table, stats calculator and the
//! live stats clock.

pub mod clock;
pub mod habit;
pub mod milestones;
pub mod stats;

pub use clock::{ManualTimeSource, StatsClock, SystemTimeSource, TimeSource};
pub use habit::{Currency, HabitDraft, HabitField, HabitProfile};
pub use milestones::{
    compute_states, current_and_next, CurrentAndNext, MilestoneDefinition, MilestoneState,
    MilestoneSummary, MilestoneTable, HEALTH_MILESTONES,
};
pub use stats::{
    calculate_stats, calculate_stats_with, format_elapsed, format_lifetime, format_money,
    StatsSnapshot, TimeSinceQuit,
};
