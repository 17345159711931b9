pub mod chat;
pub mod config_manager;
pub mod database;
pub mod entitlement;
pub mod error;
pub mod session;
pub mod store;
pub mod tracking;
pub mod utils;

// Re-export the main error types for convenience
pub use chat::ChatError;
pub use error::{BreatheError, BreatheResult, ValidationError};

// Re-export tracking types
pub use tracking::{
    calculate_stats, Currency, HabitDraft, HabitProfile, MilestoneState, MilestoneTable,
    StatsClock, StatsSnapshot, HEALTH_MILESTONES,
};

// Re-export chat types
pub use chat::{
    ChatEvent, ChatMessage, ChatSession, Coach, KeywordResponder, OfflineCoach, RemoteCoach, Role,
};

// Re-export persistence and session types
pub use database::{BreatheDatabase, JournalEntry, JournalInput, UserId};
pub use entitlement::{can_access_feature, EntitlementSource, Feature, SubscriptionStatus};
pub use session::QuitSession;
pub use store::{LocalProfileStore, ProfileStore, SyncedProfileStore};

pub use config_manager::{AppConfig, ConfigManager};
