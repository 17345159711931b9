use chrono::{DateTime, NaiveDate, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 認証済みユーザーID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

pub const MOOD_RANGE: (u8, u8) = (1, 5);
pub const CRAVING_RANGE: (u8, u8) = (1, 10);

const MOOD_LABELS: [(&str, &str); 5] = [
    ("Terrible", "😫"),
    ("Bad", "😔"),
    ("Okay", "😐"),
    ("Good", "😊"),
    ("Great", "😁"),
];

const CRAVING_LABELS: [&str; 10] = [
    "None",
    "Very Low",
    "Low",
    "Mild",
    "Moderate",
    "Notable",
    "Strong",
    "Very Strong",
    "Intense",
    "Extreme",
];

/// 気分ラベルと絵文字（1..=5）
pub fn mood_label(mood: u8) -> Option<(&'static str, &'static str)> {
    MOOD_LABELS.get(usize::from(mood).checked_sub(1)?).copied()
}

/// 渇望の強さラベル（1..=10）
pub fn craving_label(intensity: u8) -> Option<&'static str> {
    CRAVING_LABELS
        .get(usize::from(intensity).checked_sub(1)?)
        .copied()
}

/// 日記エントリ（ユーザー・日付ごとに1件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: UserId,
    pub entry_date: NaiveDate,
    pub mood: u8,
    pub craving_intensity: u8,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn mood_label(&self) -> &'static str {
        mood_label(self.mood).map(|(label, _)| label).unwrap_or("Unknown")
    }

    pub fn craving_label(&self) -> &'static str {
        craving_label(self.craving_intensity).unwrap_or("Unknown")
    }
}

/// 日記の入力値
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JournalInput {
    pub mood: u8,
    pub craving_intensity: u8,
    pub notes: Option<String>,
}

impl JournalInput {
    pub fn new(mood: u8, craving_intensity: u8) -> Self {
        Self {
            mood,
            craving_intensity,
            notes: None,
        }
    }

    /// メモを設定（空白のみの場合はなし）
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("mood", self.mood, MOOD_RANGE)?;
        check_range("craving_intensity", self.craving_intensity, CRAVING_RANGE)?;
        Ok(())
    }
}

fn check_range(
    field: &'static str,
    value: u8,
    (min, max): (u8, u8),
) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: f64::from(min),
            max: f64::from(max),
            value: f64::from(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(mood_label(1), Some(("Terrible", "😫")));
        assert_eq!(mood_label(5).map(|(l, _)| l), Some("Great"));
        assert_eq!(mood_label(0), None);
        assert_eq!(mood_label(6), None);

        assert_eq!(craving_label(1), Some("None"));
        assert_eq!(craving_label(10), Some("Extreme"));
        assert_eq!(craving_label(11), None);
    }

    #[test]
    fn test_journal_input_validation() {
        assert!(JournalInput::new(3, 7).validate().is_ok());
        assert!(matches!(
            JournalInput::new(0, 7).validate(),
            Err(ValidationError::OutOfRange { field: "mood", .. })
        ));
        assert!(matches!(
            JournalInput::new(3, 11).validate(),
            Err(ValidationError::OutOfRange {
                field: "craving_intensity",
                ..
            })
        ));
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        assert_eq!(JournalInput::new(3, 3).with_notes("  ").notes, None);
        assert_eq!(
            JournalInput::new(3, 3).with_notes("walked it off").notes,
            Some("walked it off".to_string())
        );
    }

    #[test]
    fn test_user_id_display() {
        let id = UserId::from("user-42");
        assert_eq!(format!("{}", id), "user-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-42\"");
    }
}
