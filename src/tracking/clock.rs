//! ライブ統計クロック
//!
//! 禁煙統計を一定間隔で再計算し、購読者へスナップショットを配信する
//! - プロフィール1件につきタイマーは常に1本
//! - プロフィール差し替え時はタイマーを再起動しない
//! - 停止時は決定的にキャンセルし、スナップショットをクリア

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::habit::HabitProfile;
use super::milestones::MilestoneTable;
use super::stats::{calculate_stats_with, StatsSnapshot};

/// 現在時刻の供給元
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// システム時刻
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手動で進める時刻（テスト用）
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// tick毎に呼ばれるコールバック
pub type TickHandler = Box<dyn Fn(&StatsSnapshot) + Send + Sync>;

/// クロック統計情報
#[derive(Debug, Clone, Default)]
pub struct ClockStats {
    /// 開始回数
    pub starts: u64,
    /// 発行したスナップショット数
    pub ticks: u64,
    /// 停止回数
    pub stops: u64,
}

/// tickループと共有する状態
struct ClockState {
    /// start/stop毎に進む世代番号。古いループのtickはこれで破棄される
    generation: u64,
    profile: Option<Arc<HabitProfile>>,
    on_tick: Option<Arc<TickHandler>>,
    stats: ClockStats,
}

/// 発行済みで、ハンドラへの通知が残っているtick
struct PendingTick {
    snapshot: StatsSnapshot,
    handler: Option<Arc<TickHandler>>,
}

impl PendingTick {
    fn notify(self) -> StatsSnapshot {
        if let Some(handler) = &self.handler {
            handler(&self.snapshot);
        }
        self.snapshot
    }
}

struct RunningLoop {
    cancel_sender: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// ライブ統計クロック
pub struct StatsClock {
    state: Arc<Mutex<ClockState>>,
    snapshot_tx: watch::Sender<Option<StatsSnapshot>>,
    running: Mutex<Option<RunningLoop>>,
    time_source: Arc<dyn TimeSource>,
    table: MilestoneTable,
    tick_interval: Duration,
}

impl std::fmt::Debug for StatsClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsClock")
            .field("tick_interval", &self.tick_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Default for StatsClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsClock {
    /// 1秒間隔・システム時刻のクロックを作成
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource), Duration::from_secs(1))
    }

    /// 時刻供給元とtick間隔を指定して作成
    pub fn with_time_source(time_source: Arc<dyn TimeSource>, tick_interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            state: Arc::new(Mutex::new(ClockState {
                generation: 0,
                profile: None,
                on_tick: None,
                stats: ClockStats::default(),
            })),
            snapshot_tx,
            running: Mutex::new(None),
            time_source,
            table: MilestoneTable::standard(),
            tick_interval,
        }
    }

    /// マイルストーン表を差し替え
    pub fn with_table(mut self, table: MilestoneTable) -> Self {
        self.table = table;
        self
    }

    /// スナップショットの購読
    pub fn subscribe(&self) -> watch::Receiver<Option<StatsSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// 最新スナップショット
    pub fn current(&self) -> Option<StatsSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn stats(&self) -> ClockStats {
        self.state.lock().stats.clone()
    }

    /// クロックを開始（tokioランタイム内で呼ぶこと）
    ///
    /// 既存のループはキャンセルしてから新しいループを1本だけ起動する。
    /// 開始直後に1回分のスナップショットを即時発行する。
    pub fn start<F>(&self, profile: HabitProfile, on_tick: F)
    where
        F: Fn(&StatsSnapshot) + Send + Sync + 'static,
    {
        self.cancel_running();

        let handler: Arc<TickHandler> = Arc::new(Box::new(on_tick));
        let (generation, first_tick) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.profile = Some(Arc::new(profile));
            state.on_tick = Some(handler);
            state.stats.starts += 1;
            let first_tick = self.publish_locked(&mut state);
            (state.generation, first_tick)
        };

        let (cancel_sender, cancel_receiver) = oneshot::channel();
        let handle = tokio::spawn(Self::run_loop(
            generation,
            self.tick_interval,
            cancel_receiver,
            self.state.clone(),
            self.snapshot_tx.clone(),
            self.time_source.clone(),
            self.table,
        ));

        *self.running.lock() = Some(RunningLoop {
            cancel_sender,
            handle,
        });

        tracing::info!(
            "⏱️ [CLOCK] Started stats clock (generation {}, every {:?})",
            generation,
            self.tick_interval
        );

        if let Some(tick) = first_tick {
            tick.notify();
        }
    }

    /// 実行中のループが読むプロフィールだけを差し替える
    ///
    /// クロックが停止中の場合は何もしない（`start`を使うこと）。
    pub fn replace_profile(&self, profile: HabitProfile) -> bool {
        if !self.is_running() {
            tracing::debug!("⏱️ [CLOCK] replace_profile ignored: clock not running");
            return false;
        }

        let tick = {
            let mut state = self.state.lock();
            state.profile = Some(Arc::new(profile));
            self.publish_locked(&mut state)
        };
        tracing::info!("⏱️ [CLOCK] Profile replaced without restarting timer");
        if let Some(tick) = tick {
            tick.notify();
        }
        true
    }

    /// クロックを停止し、スナップショットをクリア
    pub fn stop(&self) {
        let was_running = self.cancel_running();

        let mut state = self.state.lock();
        state.generation += 1;
        state.profile = None;
        state.on_tick = None;
        if was_running {
            state.stats.stops += 1;
        }
        self.snapshot_tx.send_replace(None);

        if was_running {
            tracing::info!("⏱️ [CLOCK] Stopped stats clock");
        }
    }

    /// 現在のプロフィールで即時再計算して発行
    pub fn refresh(&self) -> Option<StatsSnapshot> {
        let tick = {
            let mut state = self.state.lock();
            self.publish_locked(&mut state)
        }?;
        Some(tick.notify())
    }

    fn cancel_running(&self) -> bool {
        let running = self.running.lock().take();
        match running {
            Some(running) => {
                let _ = running.cancel_sender.send(());
                running.handle.abort();
                true
            }
            None => false,
        }
    }

    fn publish_locked(&self, state: &mut ClockState) -> Option<PendingTick> {
        Self::tick_locked(state, &self.snapshot_tx, self.time_source.as_ref(), &self.table)
    }

    /// ロック中に再計算と発行まで行う。ハンドラ呼び出しはロック解放後
    fn tick_locked(
        state: &mut ClockState,
        snapshot_tx: &watch::Sender<Option<StatsSnapshot>>,
        time_source: &dyn TimeSource,
        table: &MilestoneTable,
    ) -> Option<PendingTick> {
        let profile = state.profile.clone()?;
        let snapshot = calculate_stats_with(table, &profile, time_source.now());

        state.stats.ticks += 1;
        snapshot_tx.send_replace(Some(snapshot.clone()));

        Some(PendingTick {
            snapshot,
            handler: state.on_tick.clone(),
        })
    }

    /// tickループ本体
    async fn run_loop(
        generation: u64,
        tick_interval: Duration,
        mut cancel_receiver: oneshot::Receiver<()>,
        state: Arc<Mutex<ClockState>>,
        snapshot_tx: watch::Sender<Option<StatsSnapshot>>,
        time_source: Arc<dyn TimeSource>,
        table: MilestoneTable,
    ) {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // 初回tickは即時完了する（開始時の発行はstart側で済んでいる）
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {},
                _ = &mut cancel_receiver => {
                    tracing::debug!("⏱️ [CLOCK] Loop cancelled (generation {})", generation);
                    return;
                }
            }

            let tick = {
                let mut guard = state.lock();
                if guard.generation != generation {
                    tracing::debug!(
                        "⏱️ [CLOCK] Stale loop exiting (generation {})",
                        generation
                    );
                    return;
                }
                Self::tick_locked(&mut guard, &snapshot_tx, time_source.as_ref(), &table)
            };
            if let Some(tick) = tick {
                tick.notify();
            }
        }
    }
}

impl Drop for StatsClock {
    fn drop(&mut self) {
        self.cancel_running();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn profile() -> HabitProfile {
        HabitProfile::new(24.0, 10.0, 10.0, 20, start_time())
    }

    fn clock_with(time: &ManualTimeSource) -> StatsClock {
        StatsClock::with_time_source(Arc::new(time.clone()), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_publishes_immediately() {
        let time = ManualTimeSource::new(start_time() + chrono::Duration::hours(2));
        let clock = clock_with(&time);
        let rx = clock.subscribe();

        clock.start(profile(), |_| {});

        let snapshot = rx.borrow().clone().unwrap();
        assert_eq!(snapshot.cigarettes_not_smoked, 2);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_advance_with_time() {
        let time = ManualTimeSource::new(start_time());
        let clock = clock_with(&time);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        clock.start(profile(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time.advance(chrono::Duration::hours(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(count.load(Ordering::SeqCst) >= 2);
        let snapshot = clock.current().unwrap();
        assert_eq!(snapshot.cigarettes_not_smoked, 1);
        assert_eq!(snapshot.time_since_quit.hours, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_and_cancels() {
        let time = ManualTimeSource::new(start_time());
        let clock = clock_with(&time);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        clock.start(profile(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        clock.stop();

        assert!(clock.current().is_none());
        assert!(!clock.is_running());

        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(clock.current().is_none());
        assert_eq!(clock.stats().stops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer() {
        let time = ManualTimeSource::new(start_time());
        let clock = clock_with(&time);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        clock.start(profile(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        clock.start(profile(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let first_after_restart = first.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(first.load(Ordering::SeqCst), first_after_restart);
        assert!(second.load(Ordering::SeqCst) >= 4);
        assert_eq!(clock.stats().starts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_profile_without_restart() {
        let time = ManualTimeSource::new(start_time() + chrono::Duration::hours(24));
        let clock = clock_with(&time);
        clock.start(profile(), |_| {});
        assert_eq!(clock.current().unwrap().cigarettes_not_smoked, 24);

        let reset = profile().restarted_at(time.now());
        assert!(clock.replace_profile(reset));
        assert_eq!(clock.current().unwrap().cigarettes_not_smoked, 0);
        assert_eq!(clock.stats().starts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_can_call_back_into_clock() {
        let time = ManualTimeSource::new(start_time());
        let clock = Arc::new(clock_with(&time));
        let slot: Arc<OnceLock<Weak<StatsClock>>> = Arc::new(OnceLock::new());
        let _ = slot.set(Arc::downgrade(&clock));
        let seen_ticks = Arc::new(AtomicUsize::new(0));

        let handler_slot = slot.clone();
        let handler_seen = seen_ticks.clone();
        clock.start(profile(), move |snapshot| {
            let Some(clock) = handler_slot.get().and_then(Weak::upgrade) else {
                return;
            };
            // ハンドラ内からの読み出しでロックが取れること
            let ticks = clock.stats().ticks as usize;
            assert_eq!(
                clock.current().map(|s| s.cigarettes_not_smoked),
                Some(snapshot.cigarettes_not_smoked)
            );
            handler_seen.store(ticks, Ordering::SeqCst);
        });
        assert_eq!(seen_ticks.load(Ordering::SeqCst), 1);

        time.advance(chrono::Duration::hours(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(seen_ticks.load(Ordering::SeqCst) >= 2);

        assert!(clock.replace_profile(profile()));
        assert!(clock.refresh().is_some());
        clock.stop();
    }

    #[tokio::test]
    async fn test_replace_profile_when_stopped() {
        let clock = StatsClock::new();
        assert!(!clock.replace_profile(profile()));
        assert!(clock.current().is_none());
    }
}
