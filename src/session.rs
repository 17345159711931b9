//! 禁煙セッション（サインイン中のユーザー1人分）
//!
//! プロフィールの保存先・日記・統計クロックをまとめて扱う。
//! プロフィールは不変の`Arc<HabitProfile>`として丸ごと差し替える。

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::chat::{select_coach, Coach};
use crate::config_manager::CoachConfig;
use crate::database::{BreatheDatabase, JournalEntry, JournalInput, UserId};
use crate::entitlement::{can_access_feature, check_entitlement, EntitlementSource, Feature};
use crate::error::{BreatheError, BreatheResult};
use crate::store::{LocalProfileStore, ProfileStore};
use crate::tracking::{HabitProfile, StatsClock, StatsSnapshot};

pub struct QuitSession {
    user_id: UserId,
    store: Arc<dyn ProfileStore>,
    journal: Arc<Mutex<BreatheDatabase>>,
    clock: StatsClock,
    profile: Mutex<Option<Arc<HabitProfile>>>,
}

impl QuitSession {
    pub fn new(
        user_id: UserId,
        store: Arc<dyn ProfileStore>,
        journal: Arc<Mutex<BreatheDatabase>>,
        clock: StatsClock,
    ) -> Self {
        Self {
            user_id,
            store,
            journal,
            clock,
            profile: Mutex::new(None),
        }
    }

    /// ローカル保存のみのセッション
    pub fn local(user_id: UserId, store: LocalProfileStore, clock: StatsClock) -> Self {
        let journal = store.database();
        Self::new(user_id, Arc::new(store), journal, clock)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn clock(&self) -> &StatsClock {
        &self.clock
    }

    /// 現在のプロフィール
    pub fn profile(&self) -> Option<HabitProfile> {
        self.profile.lock().as_deref().cloned()
    }

    pub fn current_stats(&self) -> Option<StatsSnapshot> {
        self.clock.current()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<Option<StatsSnapshot>> {
        self.clock.subscribe()
    }

    /// 保存済みプロフィールを読み込み、あればクロックを開始
    ///
    /// プロフィールがない場合はオンボーディングが必要（`Ok(None)`）。
    pub async fn load(&self) -> BreatheResult<Option<HabitProfile>> {
        let profile = self.store.get(&self.user_id).await?;

        match &profile {
            Some(profile) => {
                tracing::info!("🚭 [SESSION] Loaded profile for {}", self.user_id);
                self.apply(profile.clone());
            }
            None => {
                tracing::info!("🚭 [SESSION] No profile for {}, onboarding needed", self.user_id);
            }
        }

        Ok(profile)
    }

    /// プロフィールを検証して保存し、クロックへ反映
    pub async fn save_profile(&self, profile: HabitProfile) -> BreatheResult<()> {
        profile.validate()?;
        self.store.put(&self.user_id, &profile).await?;
        self.apply(profile);
        tracing::info!("💾 [SESSION] Profile saved for {}", self.user_id);
        Ok(())
    }

    /// 禁煙開始日時を`now`にやり直す（習慣パラメータと日記は保持）
    pub async fn reset_program(&self, now: DateTime<Utc>) -> BreatheResult<HabitProfile> {
        let current = self.profile().ok_or_else(|| BreatheError::NoProfile {
            user_id: self.user_id.to_string(),
        })?;

        let restarted = current.restarted_at(now);
        self.save_profile(restarted.clone()).await?;
        tracing::info!("🔄 [SESSION] Program reset for {} at {}", self.user_id, now);
        Ok(restarted)
    }

    /// プロフィールと日記をすべて削除し、クロックを停止
    pub async fn delete_all_data(&self) -> BreatheResult<()> {
        self.store.delete(&self.user_id).await?;
        let deleted_entries = self.journal.lock().delete_journal_entries(&self.user_id)?;

        self.clear();
        tracing::info!(
            "🗑️ [SESSION] Deleted all data for {} ({} journal entries)",
            self.user_id,
            deleted_entries
        );
        Ok(())
    }

    /// サインアウト（データは残す）
    pub fn sign_out(&self) {
        self.clear();
        tracing::info!("👋 [SESSION] Signed out {}", self.user_id);
    }

    /// 指定日の日記を保存
    pub fn save_journal_entry(
        &self,
        entry_date: NaiveDate,
        input: &JournalInput,
    ) -> BreatheResult<JournalEntry> {
        self.journal
            .lock()
            .upsert_journal_entry(&self.user_id, entry_date, input)
    }

    /// 日記一覧（新しい順）
    pub fn journal_entries(&self) -> BreatheResult<Vec<JournalEntry>> {
        self.journal.lock().get_journal_entries(&self.user_id, None)
    }

    pub fn journal_entry_for(&self, entry_date: NaiveDate) -> BreatheResult<Option<JournalEntry>> {
        self.journal.lock().get_journal_entry(&self.user_id, entry_date)
    }

    /// 機能へのアクセス可否（確認できない場合は不可）
    pub async fn can_access(&self, feature: Feature, source: &dyn EntitlementSource) -> bool {
        if !feature.requires_subscription() {
            return true;
        }
        let entitled = check_entitlement(source, &self.user_id).await;
        can_access_feature(feature, entitled)
    }

    /// このユーザー向けのコーチ（購読していなければオフライン）
    pub async fn coach(
        &self,
        config: &CoachConfig,
        source: &dyn EntitlementSource,
        bearer_token: Option<String>,
    ) -> Box<dyn Coach> {
        let entitled = config.use_remote && self.can_access(Feature::CoachChat, source).await;
        select_coach(config, entitled, bearer_token)
    }

    fn apply(&self, profile: HabitProfile) {
        *self.profile.lock() = Some(Arc::new(profile.clone()));

        if !self.clock.replace_profile(profile.clone()) {
            self.clock.start(profile, |snapshot| {
                tracing::trace!(
                    "⏱️ [CLOCK] {} not smoked, {}",
                    snapshot.cigarettes_not_smoked,
                    snapshot.formatted_elapsed()
                );
            });
        }
    }

    fn clear(&self) {
        *self.profile.lock() = None;
        self.clock.stop();
    }
}
