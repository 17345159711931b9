//! 禁煙プロフィールの保存先
//!
//! - `ProfileStore`: 保存先の共通インターフェース（リモートもこれを実装する）
//! - `LocalProfileStore`: SQLiteによるローカル保存
//! - `SyncedProfileStore`: ローカル優先、リモートはベストエフォート

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::database::{BreatheDatabase, UserId};
use crate::error::BreatheResult;
use crate::tracking::HabitProfile;

/// Per-user habit profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> BreatheResult<Option<HabitProfile>>;

    async fn put(&self, user_id: &UserId, profile: &HabitProfile) -> BreatheResult<()>;

    async fn delete(&self, user_id: &UserId) -> BreatheResult<()>;
}

/// SQLiteに保存するストア
#[derive(Clone)]
pub struct LocalProfileStore {
    db: Arc<Mutex<BreatheDatabase>>,
}

impl LocalProfileStore {
    pub fn new(db: BreatheDatabase) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// 日記など、同じ接続を使う処理向け
    pub fn database(&self) -> Arc<Mutex<BreatheDatabase>> {
        self.db.clone()
    }
}

#[async_trait]
impl ProfileStore for LocalProfileStore {
    async fn get(&self, user_id: &UserId) -> BreatheResult<Option<HabitProfile>> {
        self.db.lock().get_habit_profile(user_id)
    }

    async fn put(&self, user_id: &UserId, profile: &HabitProfile) -> BreatheResult<()> {
        self.db.lock().upsert_habit_profile(user_id, profile)
    }

    async fn delete(&self, user_id: &UserId) -> BreatheResult<()> {
        self.db.lock().delete_habit_profile(user_id)?;
        Ok(())
    }
}

/// プロセス内メモリのストア
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<Mutex<HashMap<UserId, HabitProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.lock().is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &UserId) -> BreatheResult<Option<HabitProfile>> {
        Ok(self.profiles.lock().get(user_id).cloned())
    }

    async fn put(&self, user_id: &UserId, profile: &HabitProfile) -> BreatheResult<()> {
        self.profiles
            .lock()
            .insert(user_id.clone(), profile.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> BreatheResult<()> {
        self.profiles.lock().remove(user_id);
        Ok(())
    }
}

/// ローカルを正とし、リモートへ同期するストア
///
/// - 書き込み: ローカルに書いてからリモートへ。リモートの失敗は警告のみ
/// - 読み込み: リモートにあればローカルを更新して返す。失敗・未登録ならローカル
pub struct SyncedProfileStore<R> {
    local: LocalProfileStore,
    remote: R,
}

impl<R: ProfileStore> SyncedProfileStore<R> {
    pub fn new(local: LocalProfileStore, remote: R) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalProfileStore {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }
}

#[async_trait]
impl<R: ProfileStore> ProfileStore for SyncedProfileStore<R> {
    async fn get(&self, user_id: &UserId) -> BreatheResult<Option<HabitProfile>> {
        match self.remote.get(user_id).await {
            Ok(Some(profile)) => {
                if let Err(e) = self.local.put(user_id, &profile).await {
                    tracing::warn!("⚠️ [STORE] Failed to refresh local copy: {}", e);
                }
                Ok(Some(profile))
            }
            Ok(None) => self.local.get(user_id).await,
            Err(e) => {
                tracing::warn!("⚠️ [STORE] Remote read failed, using local copy: {}", e);
                self.local.get(user_id).await
            }
        }
    }

    async fn put(&self, user_id: &UserId, profile: &HabitProfile) -> BreatheResult<()> {
        self.local.put(user_id, profile).await?;

        if let Err(e) = self.remote.put(user_id, profile).await {
            tracing::warn!("⚠️ [STORE] Remote write failed, kept local copy: {}", e);
        }
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> BreatheResult<()> {
        self.local.delete(user_id).await?;

        if let Err(e) = self.remote.delete(user_id).await {
            tracing::warn!("⚠️ [STORE] Remote delete failed: {}", e);
        }
        Ok(())
    }
}
