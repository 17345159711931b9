use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{BreatheDatabase, UserId};
use crate::error::BreatheResult;
use crate::tracking::{Currency, HabitProfile};

/// ミリ秒精度のRFC3339文字列
pub(crate) fn to_db_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_db_timestamp(
    column: usize,
    name: &str,
    value: &str,
) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_e| {
            rusqlite::Error::InvalidColumnType(
                column,
                name.to_string(),
                rusqlite::types::Type::Text,
            )
        })
}

impl BreatheDatabase {
    /// 禁煙プロフィールを作成または更新
    pub fn upsert_habit_profile(
        &mut self,
        user_id: &UserId,
        profile: &HabitProfile,
    ) -> BreatheResult<()> {
        let now = to_db_timestamp(&Utc::now());

        self.connection.execute(
            "INSERT INTO habit_profiles
             (user_id, cigarettes_per_day, years_smoked, price_per_pack, cigarettes_per_pack,
              quit_date, currency, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(user_id) DO UPDATE SET
                cigarettes_per_day = excluded.cigarettes_per_day,
                years_smoked = excluded.years_smoked,
                price_per_pack = excluded.price_per_pack,
                cigarettes_per_pack = excluded.cigarettes_per_pack,
                quit_date = excluded.quit_date,
                currency = excluded.currency,
                updated_at = excluded.updated_at",
            params![
                user_id.as_str(),
                profile.cigarettes_per_day,
                profile.years_smoked,
                profile.price_per_pack,
                profile.cigarettes_per_pack,
                to_db_timestamp(&profile.quit_date),
                profile.currency.code(),
                now,
            ],
        )?;

        tracing::debug!("💾 [DB] Saved habit profile for {}", user_id);
        Ok(())
    }

    /// 禁煙プロフィールを取得
    pub fn get_habit_profile(&self, user_id: &UserId) -> BreatheResult<Option<HabitProfile>> {
        let profile = self
            .connection
            .query_row(
                "SELECT cigarettes_per_day, years_smoked, price_per_pack, cigarettes_per_pack,
                        quit_date, currency
                 FROM habit_profiles WHERE user_id = ?1",
                params![user_id.as_str()],
                Self::row_to_habit_profile,
            )
            .optional()?;

        Ok(profile)
    }

    /// 禁煙プロフィールを削除
    pub fn delete_habit_profile(&mut self, user_id: &UserId) -> BreatheResult<bool> {
        let affected = self.connection.execute(
            "DELETE FROM habit_profiles WHERE user_id = ?1",
            params![user_id.as_str()],
        )?;

        if affected > 0 {
            tracing::info!("🗑️ [DB] Deleted habit profile for {}", user_id);
        }
        Ok(affected > 0)
    }

    /// データベースの行をプロフィールに変換
    fn row_to_habit_profile(row: &Row) -> rusqlite::Result<HabitProfile> {
        let quit_date: String = row.get(4)?;
        let currency: String = row.get(5)?;

        Ok(HabitProfile {
            cigarettes_per_day: row.get(0)?,
            years_smoked: row.get(1)?,
            price_per_pack: row.get(2)?,
            cigarettes_per_pack: row.get(3)?,
            quit_date: parse_db_timestamp(4, "quit_date", &quit_date)?,
            // 未知の通貨コードは既定値
            currency: Currency::from_code(&currency).unwrap_or_default(),
        })
    }
}
