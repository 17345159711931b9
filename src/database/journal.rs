//! 日記（気分・渇望の記録）
//!
//! ユーザーと日付の組につき1件。同じ日に保存し直すと上書きされる。

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::crud::{parse_db_timestamp, to_db_timestamp};
use super::{BreatheDatabase, JournalEntry, JournalInput, UserId};
use crate::error::BreatheResult;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl BreatheDatabase {
    /// 指定日の日記を作成または更新
    pub fn upsert_journal_entry(
        &mut self,
        user_id: &UserId,
        entry_date: NaiveDate,
        input: &JournalInput,
    ) -> BreatheResult<JournalEntry> {
        input.validate()?;

        let now = to_db_timestamp(&Utc::now());
        let date = entry_date.format(DATE_FORMAT).to_string();

        self.connection.execute(
            "INSERT INTO journal_entries
             (id, user_id, entry_date, mood, craving_intensity, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(user_id, entry_date) DO UPDATE SET
                mood = excluded.mood,
                craving_intensity = excluded.craving_intensity,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                user_id.as_str(),
                date,
                input.mood,
                input.craving_intensity,
                input.notes,
                now,
            ],
        )?;

        tracing::debug!("📓 [JOURNAL] Saved entry for {} on {}", user_id, date);

        self.get_journal_entry(user_id, entry_date)?.ok_or_else(|| {
            crate::error::BreatheError::store("journal upsert", "entry missing after write")
        })
    }

    /// 指定日の日記を取得
    pub fn get_journal_entry(
        &self,
        user_id: &UserId,
        entry_date: NaiveDate,
    ) -> BreatheResult<Option<JournalEntry>> {
        let entry = self
            .connection
            .query_row(
                "SELECT * FROM journal_entries WHERE user_id = ?1 AND entry_date = ?2",
                params![user_id.as_str(), entry_date.format(DATE_FORMAT).to_string()],
                Self::row_to_journal_entry,
            )
            .optional()?;

        Ok(entry)
    }

    /// 日記一覧を新しい日付順で取得
    pub fn get_journal_entries(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> BreatheResult<Vec<JournalEntry>> {
        let sql = if let Some(limit) = limit {
            format!(
                "SELECT * FROM journal_entries WHERE user_id = ?1 ORDER BY entry_date DESC LIMIT {}",
                limit
            )
        } else {
            "SELECT * FROM journal_entries WHERE user_id = ?1 ORDER BY entry_date DESC".to_string()
        };

        let mut stmt = self.connection.prepare(&sql)?;
        let entry_iter = stmt.query_map(params![user_id.as_str()], Self::row_to_journal_entry)?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }

    /// ユーザーの日記をすべて削除
    pub fn delete_journal_entries(&mut self, user_id: &UserId) -> BreatheResult<usize> {
        let deleted = self.connection.execute(
            "DELETE FROM journal_entries WHERE user_id = ?1",
            params![user_id.as_str()],
        )?;

        tracing::info!("🗑️ [JOURNAL] Deleted {} entries for {}", deleted, user_id);
        Ok(deleted)
    }

    /// データベースの行を日記エントリに変換
    fn row_to_journal_entry(row: &Row) -> rusqlite::Result<JournalEntry> {
        let entry_date: String = row.get("entry_date")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(JournalEntry {
            id: row.get("id")?,
            user_id: UserId::new(row.get::<_, String>("user_id")?),
            entry_date: NaiveDate::parse_from_str(&entry_date, DATE_FORMAT).map_err(|_e| {
                rusqlite::Error::InvalidColumnType(
                    2,
                    "entry_date".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?,
            mood: row.get("mood")?,
            craving_intensity: row.get("craving_intensity")?,
            notes: row.get("notes")?,
            created_at: parse_db_timestamp(6, "created_at", &created_at)?,
            updated_at: parse_db_timestamp(7, "updated_at", &updated_at)?,
        })
    }
}
