//! Health-recovery milestone table.
//!
//! The table is ordered ascending by `time_in_hours`; "current" and "next"
//! milestone lookups rely on that order and never re-sort.

use serde::Serialize;

/// A fixed health-recovery event keyed by elapsed hours since quitting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub time_in_hours: f64,
}

/// A milestone evaluated against a specific elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneState {
    #[serde(flatten)]
    pub definition: MilestoneDefinition,
    pub achieved: bool,
    /// Percentage in `[0, 100]`
    pub progress: f64,
}

impl MilestoneState {
    fn evaluate(definition: &MilestoneDefinition, elapsed_hours: f64) -> Self {
        let hours = clamp_hours(elapsed_hours);
        Self {
            definition: definition.clone(),
            achieved: hours >= definition.time_in_hours,
            progress: (100.0 * hours / definition.time_in_hours).min(100.0),
        }
    }

    pub fn id(&self) -> &'static str {
        self.definition.id
    }
}

/// Result of [`MilestoneTable::current_and_next`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CurrentAndNext {
    /// Last achieved milestone, if any
    pub current: Option<MilestoneState>,
    /// First unachieved milestone; `None` once every milestone is reached
    pub next: Option<MilestoneState>,
}

/// Achieved/upcoming partitions for the achievements view.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MilestoneSummary {
    pub achieved: Vec<MilestoneState>,
    pub upcoming: Vec<MilestoneState>,
}

impl MilestoneSummary {
    pub fn total(&self) -> usize {
        self.achieved.len() + self.upcoming.len()
    }

    /// Every milestone has been reached
    pub fn is_fully_recovered(&self) -> bool {
        self.upcoming.is_empty()
    }
}

/// Ordered milestone definitions plus the pure evaluation functions.
#[derive(Debug, Clone, Copy)]
pub struct MilestoneTable {
    definitions: &'static [MilestoneDefinition],
}

impl Default for MilestoneTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl MilestoneTable {
    /// The built-in health-recovery table
    pub const fn standard() -> Self {
        Self {
            definitions: HEALTH_MILESTONES,
        }
    }

    /// A custom table; callers must keep it sorted by `time_in_hours`
    pub const fn from_static(definitions: &'static [MilestoneDefinition]) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &'static [MilestoneDefinition] {
        self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Evaluate every milestone, preserving table order.
    pub fn compute_states(&self, elapsed_hours: f64) -> Vec<MilestoneState> {
        self.definitions
            .iter()
            .map(|definition| MilestoneState::evaluate(definition, elapsed_hours))
            .collect()
    }

    /// Last achieved and first unachieved milestone.
    pub fn current_and_next(&self, elapsed_hours: f64) -> CurrentAndNext {
        let summary = self.summary(elapsed_hours);
        CurrentAndNext {
            current: summary.achieved.last().cloned(),
            next: summary.upcoming.first().cloned(),
        }
    }

    pub fn summary(&self, elapsed_hours: f64) -> MilestoneSummary {
        let (achieved, upcoming): (Vec<_>, Vec<_>) = self
            .compute_states(elapsed_hours)
            .into_iter()
            .partition(|state| state.achieved);

        MilestoneSummary { achieved, upcoming }
    }

    pub fn achieved_count(&self, elapsed_hours: f64) -> usize {
        let hours = clamp_hours(elapsed_hours);
        self.definitions
            .iter()
            .filter(|definition| hours >= definition.time_in_hours)
            .count()
    }
}

/// Evaluate the standard table.
pub fn compute_states(elapsed_hours: f64) -> Vec<MilestoneState> {
    MilestoneTable::standard().compute_states(elapsed_hours)
}

/// Current and next milestone from the standard table.
pub fn current_and_next(elapsed_hours: f64) -> CurrentAndNext {
    MilestoneTable::standard().current_and_next(elapsed_hours)
}

// Negative or NaN elapsed time (clock skew) counts as "just quit".
fn clamp_hours(elapsed_hours: f64) -> f64 {
    if elapsed_hours.is_nan() {
        0.0
    } else {
        elapsed_hours.max(0.0)
    }
}

macro_rules! milestone {
    ($id:literal, $hours:expr, $icon:literal, $title:literal, $description:literal) => {
        MilestoneDefinition {
            id: $id,
            title: $title,
            description: $description,
            icon: $icon,
            time_in_hours: $hours,
        }
    };
}

pub static HEALTH_MILESTONES: &[MilestoneDefinition] = &[
    // minutes to hours
    milestone!(
        "20min",
        0.33,
        "❤️",
        "Heart Rate Normalizes",
        "Your heart rate and blood pressure begin to drop to normal levels."
    ),
    milestone!(
        "2hours",
        2.0,
        "💪",
        "Nicotine Cravings Begin",
        "You may feel the first cravings. Stay strong - they peak and pass!"
    ),
    milestone!(
        "4hours",
        4.0,
        "🩸",
        "Blood Sugar Stabilizes",
        "Your blood sugar levels are normalizing without nicotine stimulation."
    ),
    milestone!(
        "8hours",
        8.0,
        "🫁",
        "Oxygen Levels Rise",
        "Carbon monoxide levels in your blood drop, oxygen levels increase."
    ),
    milestone!(
        "12hours",
        12.0,
        "🌬️",
        "Carbon Monoxide Cleared",
        "Carbon monoxide levels return to normal, improving oxygen delivery."
    ),
    // days
    milestone!(
        "24hours",
        24.0,
        "🫀",
        "Heart Attack Risk Drops",
        "Your risk of heart attack begins to decrease significantly."
    ),
    milestone!(
        "36hours",
        36.0,
        "👃",
        "Sense of Smell Returns",
        "Your sense of smell and taste start to improve noticeably."
    ),
    milestone!(
        "48hours",
        48.0,
        "✨",
        "Nicotine Free",
        "All nicotine has left your body. Nerve endings start regenerating."
    ),
    milestone!(
        "72hours",
        72.0,
        "🌈",
        "Breathing Easier",
        "Bronchial tubes relax, breathing becomes easier, energy increases."
    ),
    milestone!(
        "5days",
        120.0,
        "🎯",
        "Cravings Reduce",
        "Most nicotine cravings last only 3-5 minutes. You're getting stronger!"
    ),
    // weeks
    milestone!(
        "1week",
        168.0,
        "🌟",
        "One Week Strong",
        "You've made it a full week! The hardest part is behind you."
    ),
    milestone!(
        "10days",
        240.0,
        "😁",
        "Circulation Improving",
        "Blood flow to your gums and teeth is now similar to a non-smoker."
    ),
    milestone!(
        "2weeks",
        336.0,
        "🚶",
        "Circulation Boost",
        "Your circulation has significantly improved, walking becomes easier."
    ),
    milestone!(
        "3weeks",
        504.0,
        "🧘",
        "Withdrawal Fading",
        "Physical withdrawal symptoms are mostly gone. Mental habits remain."
    ),
    // months
    milestone!(
        "1month",
        720.0,
        "🏃",
        "Lung Function Boost",
        "Lung function increases up to 30%. Coughing and shortness of breath decrease."
    ),
    milestone!(
        "6weeks",
        1008.0,
        "✨",
        "Skin Glowing",
        "Your skin is clearer and more hydrated. The \"smoker's complexion\" fades."
    ),
    milestone!(
        "2months",
        1440.0,
        "🌱",
        "Cilia Recovering",
        "The cilia in your lungs are regrowing, helping clear mucus and debris."
    ),
    milestone!(
        "3months",
        2160.0,
        "🛡️",
        "Cilia Regenerated",
        "The cilia in your lungs have regrown, reducing risk of infection."
    ),
    milestone!(
        "4months",
        2880.0,
        "🏋️",
        "Exercise Easier",
        "Physical activities feel easier. Your body is healing rapidly."
    ),
    milestone!(
        "6months",
        4320.0,
        "😌",
        "Stress Response Normal",
        "Your body's stress response has normalized without nicotine."
    ),
    milestone!(
        "9months",
        6480.0,
        "💨",
        "Lungs Significantly Healed",
        "Lung cilia fully recovered. Infections, colds, and breathing issues decrease."
    ),
    // years
    milestone!(
        "1year",
        8760.0,
        "🎉",
        "Heart Disease Risk Halved",
        "Your excess risk of coronary heart disease is now half that of a smoker."
    ),
    milestone!(
        "18months",
        13140.0,
        "📉",
        "Lung Cancer Risk Dropping",
        "Your risk of lung cancer is starting to decrease significantly."
    ),
    milestone!(
        "2years",
        17520.0,
        "🧠",
        "Stroke Risk Reduced",
        "Your risk of stroke has dramatically decreased."
    ),
    milestone!(
        "3years",
        26280.0,
        "❤️‍🩹",
        "Heart Attack Risk Normal",
        "Your risk of heart attack is now similar to someone who never smoked."
    ),
    milestone!(
        "5years",
        43800.0,
        "🧠",
        "Stroke Risk Normalized",
        "Your risk of stroke is now the same as a non-smoker."
    ),
    milestone!(
        "7years",
        61320.0,
        "🩺",
        "Type 2 Diabetes Risk Normal",
        "Your risk of type 2 diabetes is the same as a non-smoker."
    ),
    milestone!(
        "10years",
        87600.0,
        "🏆",
        "Lung Cancer Risk Halved",
        "Your risk of dying from lung cancer is about half that of a smoker."
    ),
    milestone!(
        "15years",
        131400.0,
        "💖",
        "Heart Disease Risk Normal",
        "Your risk of heart disease is now equal to a non-smoker."
    ),
    milestone!(
        "20years",
        175200.0,
        "👑",
        "All Risks Normalized",
        "Your risk of death from smoking-related causes is similar to a non-smoker."
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    static TIED: &[MilestoneDefinition] = &[
        milestone!("a", 1.0, "", "A", ""),
        milestone!("b", 2.0, "", "B", ""),
        milestone!("c", 2.0, "", "C", ""),
        milestone!("d", 3.0, "", "D", ""),
    ];

    #[test]
    fn test_table_is_sorted_and_unique() {
        let table = MilestoneTable::standard();
        assert_eq!(table.len(), 30);

        for pair in table.definitions().windows(2) {
            assert!(pair[0].time_in_hours < pair[1].time_in_hours);
        }

        let mut ids: Vec<_> = table.definitions().iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), table.len());
    }

    #[test]
    fn test_zero_elapsed() {
        let result = current_and_next(0.0);
        assert!(result.current.is_none());

        let next = result.next.unwrap();
        assert_eq!(next.id(), "20min");
        assert_eq!(next.progress, 0.0);
        assert!(!next.achieved);
    }

    #[test]
    fn test_beyond_last_milestone() {
        let result = current_and_next(200_000.0);
        assert!(result.next.is_none());
        assert_eq!(result.current.unwrap().id(), "20years");
        assert!(MilestoneTable::standard()
            .summary(200_000.0)
            .is_fully_recovered());
    }

    #[test]
    fn test_achieved_exactly_at_threshold() {
        for definition in HEALTH_MILESTONES {
            let before = MilestoneState::evaluate(definition, definition.time_in_hours * 0.999);
            let at = MilestoneState::evaluate(definition, definition.time_in_hours);
            assert!(!before.achieved, "{} achieved too early", definition.id);
            assert!(at.achieved, "{} not achieved at threshold", definition.id);
            assert!((at.progress - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_progress_is_monotonic() {
        let table = MilestoneTable::standard();
        let samples = [0.0, 0.1, 0.33, 1.0, 5.5, 24.0, 100.0, 1000.0, 9000.0, 180_000.0];

        let mut previous = table.compute_states(samples[0]);
        for hours in &samples[1..] {
            let current = table.compute_states(*hours);
            for (before, after) in previous.iter().zip(&current) {
                assert!(after.progress >= before.progress);
                assert!(after.achieved || !before.achieved);
                assert!((0.0..=100.0).contains(&after.progress));
            }
            previous = current;
        }
    }

    #[test]
    fn test_negative_elapsed_clamps() {
        let states = compute_states(-12.0);
        assert!(states.iter().all(|s| !s.achieved && s.progress == 0.0));
        assert!(current_and_next(-12.0).current.is_none());
        assert_eq!(MilestoneTable::standard().achieved_count(f64::NAN), 0);
    }

    #[test]
    fn test_mid_table() {
        let result = current_and_next(30.0);
        assert_eq!(result.current.unwrap().id(), "24hours");

        let next = result.next.unwrap();
        assert_eq!(next.id(), "36hours");
        assert!((next.progress - 30.0 / 36.0 * 100.0).abs() < 1e-9);
        assert_eq!(MilestoneTable::standard().achieved_count(30.0), 6);
    }

    #[test]
    fn test_ties_keep_definition_order() {
        let table = MilestoneTable::from_static(TIED);

        let result = table.current_and_next(2.0);
        assert_eq!(result.current.unwrap().id(), "c");
        assert_eq!(result.next.unwrap().id(), "d");

        let result = table.current_and_next(1.5);
        assert_eq!(result.next.unwrap().id(), "b");
    }

    #[test]
    fn test_summary_counts() {
        let summary = MilestoneTable::standard().summary(48.0);
        assert_eq!(summary.achieved.len(), 8);
        assert_eq!(summary.total(), 30);
        assert!(!summary.is_fully_recovered());
    }
}
