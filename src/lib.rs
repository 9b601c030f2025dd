pub mod config;
pub mod error;
pub mod storage;
pub mod store;
pub mod sync;

// Re-export the main error types for convenience
pub use error::{StateError, StateResult};

// Re-export configuration
pub use config::{BackendSettings, StateConfig};

// Re-export storage adapter surface
pub use storage::{KeyValueStorage, MemoryKeyValueStorage, SqliteKeyValueStorage, VersionedSnapshot};

// Re-export stores and records
pub use store::{
    load_store, save_store, Achievement, AchievementMetric, AnalyticsState, AnalyticsStore,
    AnalyticsSummary, ChatMessage, ChatMessageKind, ChatRoom, ChatState, ChatStore, Conversation,
    DailyStats, DailyStatsKey, DirectMessage, GamingEvent, NewsItem, NewsState, NewsStore,
    PersistentState, RoomRenamePolicy, StreamSession,
};

// Re-export backend sync helper
pub use sync::{
    BackendError, BackendRowClient, FollowerSync, HttpBackendClient, OutboxEntry, RelationKind,
    SyncOp,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Test that the main store types are accessible from the crate root
        assert!(std::any::type_name::<ChatStore>().contains("ChatStore"));
        assert!(std::any::type_name::<AnalyticsStore>().contains("AnalyticsStore"));
        assert!(std::any::type_name::<NewsStore>().contains("NewsStore"));
    }

    #[test]
    fn test_storage_keys_are_distinct() {
        let keys = [
            storage::keys::CHAT_STATE,
            storage::keys::ANALYTICS_STATE,
            storage::keys::NEWS_STATE,
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_error_types_re_exported() {
        // Test that error types are available from the crate root
        let _storage_error = StateError::Storage("test".to_string());
        let _backend_error = BackendError::new(None, "test");
    }

    #[test]
    fn test_identifier_formats() {
        assert_eq!(store::chat::chat_room_id_for("s1"), "chat_room_s1");
        assert_eq!(store::chat::conversation_id_for("b", "a"), "a-b");
    }
}
