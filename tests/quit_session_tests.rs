//! 禁煙セッションの統合テスト
//!
//! オンボーディング → ライブ統計 → リセット → 全削除 の一連の流れ

use std::sync::Arc;
use std::time::Duration;

use breathe_free::chat::offline::CRAVING_REPLY;
use breathe_free::config_manager::{AppConfig, ConfigManager};
use breathe_free::entitlement::StaticEntitlement;
use breathe_free::store::MemoryProfileStore;
use breathe_free::tracking::{HabitDraft, HabitField, ManualTimeSource};
use breathe_free::{
    BreatheDatabase, ChatSession, Feature, JournalInput, LocalProfileStore, ProfileStore,
    QuitSession, StatsClock, SubscriptionStatus, SyncedProfileStore, UserId,
};
use chrono::{DateTime, TimeZone, Utc};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 8, 30, 0).unwrap()
}

struct Harness {
    session: QuitSession,
    remote: MemoryProfileStore,
    time: ManualTimeSource,
}

fn harness(config: &AppConfig) -> Harness {
    let time = ManualTimeSource::new(start());
    let local = LocalProfileStore::new(BreatheDatabase::new_in_memory().unwrap());
    let journal = local.database();
    let remote = MemoryProfileStore::new();
    let store = SyncedProfileStore::new(local, remote.clone());
    let clock = StatsClock::with_time_source(Arc::new(time.clone()), config.tick_interval());

    Harness {
        session: QuitSession::new(UserId::from("user-1"), Arc::new(store), journal, clock),
        remote,
        time,
    }
}

#[cfg(test)]
mod quit_flow_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_onboarding_to_live_stats() {
        let config = AppConfig::default();
        let h = harness(&config);
        assert!(h.session.load().await.unwrap().is_none());

        // オンボーディング：1日20本、1箱10ユーロ
        let mut draft = config.habit_draft();
        for _ in 0..10 {
            draft.clamp_step(HabitField::CigarettesPerDay, 1.0);
        }
        draft.clamp_step(HabitField::PricePerPack, 2.0);
        let profile = draft.finish(start()).unwrap();
        assert_eq!(profile.cigarettes_per_day, 20.0);
        assert_eq!(profile.price_per_pack, 10.0);

        h.session.save_profile(profile.clone()).await.unwrap();
        assert_eq!(
            h.remote.get(&UserId::from("user-1")).await.unwrap(),
            Some(profile)
        );

        let mut stats = h.session.subscribe_stats();
        assert_eq!(stats.borrow().as_ref().unwrap().cigarettes_not_smoked, 0);

        // 6時間後：20/24*6 = 5本、1本0.5ユーロ
        h.time.advance(chrono::Duration::hours(6));
        tokio::time::advance(config.tick_interval()).await;
        stats.changed().await.unwrap();

        let snapshot = stats.borrow().clone().unwrap();
        assert_eq!(snapshot.cigarettes_not_smoked, 5);
        assert_eq!(snapshot.formatted_money(), "€2.50");
        assert_eq!(snapshot.lifetime_regained_minutes, 55);
        assert_eq!(snapshot.current_milestone.as_ref().unwrap().id(), "4hours");
        assert_eq!(snapshot.next_milestone.as_ref().unwrap().id(), "8hours");
        assert_eq!(snapshot.formatted_elapsed(), "6h 0m 0s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_delete() {
        let h = harness(&AppConfig::default());
        let user = UserId::from("user-1");
        let profile = HabitDraft::default().finish(start()).unwrap();
        h.session.save_profile(profile).await.unwrap();
        h.session
            .save_journal_entry(start().date_naive(), &JournalInput::new(3, 6))
            .unwrap();

        h.time.advance(chrono::Duration::days(2));
        let now = h.time_now();
        let restarted = h.session.reset_program(now).await.unwrap();

        assert_eq!(restarted.quit_date, now);
        assert_eq!(h.remote.get(&user).await.unwrap(), Some(restarted));
        assert_eq!(h.session.journal_entries().unwrap().len(), 1);
        assert_eq!(h.session.current_stats().unwrap().cigarettes_not_smoked, 0);

        h.session.delete_all_data().await.unwrap();
        assert!(h.remote.is_empty());
        assert!(h.session.journal_entries().unwrap().is_empty());
        assert!(h.session.current_stats().is_none());
        assert!(h.session.load().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_user_falls_back_to_offline_coach() {
        let h = harness(&AppConfig::default());
        let free = StaticEntitlement::default();
        let mut config = AppConfig::default();
        config.coach.use_remote = true;

        assert!(!h.session.can_access(Feature::CoachChat, &free).await);

        let coach = h.session.coach(&config.coach, &free, None).await;
        assert_eq!(coach.name(), "offline");

        let chat = ChatSession::new();
        let reply = chat
            .send("I'm having a craving", coach.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.content, CRAVING_REPLY);
    }

    #[tokio::test]
    async fn test_subscriber_gets_remote_coach() {
        let h = harness(&AppConfig::default());
        let end = start() + chrono::Duration::days(30);
        let subscribed = StaticEntitlement::new(SubscriptionStatus::active("prod_pro", end));

        let mut config = AppConfig::default();
        let coach = h.session.coach(&config.coach, &subscribed, None).await;
        assert_eq!(coach.name(), "offline");

        config.coach.use_remote = true;
        let coach = h
            .session
            .coach(&config.coach, &subscribed, Some("token".to_string()))
            .await;
        assert_eq!(coach.name(), "remote");
    }

    #[test]
    fn test_config_drives_tick_interval() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.toml")).unwrap();

        let mut config = AppConfig::default();
        config.clock.tick_interval_ms = 0;
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.tick_interval(), Duration::from_millis(1));
    }
}

impl Harness {
    fn time_now(&self) -> DateTime<Utc> {
        use breathe_free::tracking::TimeSource;
        self.time.now()
    }
}
