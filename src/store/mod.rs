//! ローカル状態ストア群
//!
//! 各ストアは1機能分の正規化レコード集合を保持する単純なコンテナで、
//! 同期的なアクション（全置換のVec操作）と純粋なセレクタを公開する。
//! 永続化は状態構造体全体を1キーへスナップショットとして書き出す方式。
//!
//! ストアはグローバルシングルトンではなく、アプリ起動時に構築して
//! 依存注入で配る。テストでは独立したインスタンスを作ればよい。

pub mod analytics;
pub mod chat;
pub mod news;

pub use analytics::{
    Achievement, AchievementMetric, AnalyticsState, AnalyticsStore, AnalyticsSummary, DailyStats,
    DailyStatsKey, StreamSession,
};
pub use chat::{
    ChatMessage, ChatMessageKind, ChatRoom, ChatState, ChatStore, Conversation, DirectMessage,
    RoomRenamePolicy,
};
pub use news::{GamingEvent, NewsItem, NewsState, NewsStore};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::StateResult;
use crate::storage::{KeyValueStorage, VersionedSnapshot};

/// 永続化対象の状態構造体が実装する契約
///
/// `migrate`は旧バージョンのpayloadを現行スキーマへ変換する。
/// 現行バージョンのpayloadはそのまま返すこと。
pub trait PersistentState: Serialize + DeserializeOwned + Default {
    /// ストレージ上のキー
    const STORAGE_KEY: &'static str;
    /// 現行スキーマバージョン
    const SCHEMA_VERSION: u32;

    fn migrate(version: u32, payload: Value) -> StateResult<Value> {
        let _ = version;
        Ok(payload)
    }
}

/// ストレージから状態をロードする
///
/// 読み込み失敗・パース失敗は初回起動（空状態）と区別しない。
/// 警告ログを残してDefaultへフォールバックする。
pub async fn load_store<S: PersistentState>(storage: &dyn KeyValueStorage) -> S {
    let raw = match storage.get(S::STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return S::default(),
        Err(e) => {
            warn!("Failed to read state for {}: {}", S::STORAGE_KEY, e);
            return S::default();
        }
    };

    match decode_snapshot::<S>(&raw) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "Discarding unreadable snapshot for {}: {}",
                S::STORAGE_KEY,
                e
            );
            S::default()
        }
    }
}

/// 状態全体をスナップショットとしてストレージへ書き出す
pub async fn save_store<S: PersistentState>(
    storage: &dyn KeyValueStorage,
    state: &S,
) -> StateResult<()> {
    let snapshot = VersionedSnapshot::encode(S::SCHEMA_VERSION, state)?;
    let raw = snapshot.to_storage_string()?;
    storage.set(S::STORAGE_KEY, &raw).await
}

fn decode_snapshot<S: PersistentState>(raw: &str) -> StateResult<S> {
    let snapshot = VersionedSnapshot::from_storage_string(raw)?;
    snapshot.ensure_not_newer(S::SCHEMA_VERSION)?;

    let payload = if snapshot.version < S::SCHEMA_VERSION {
        tracing::info!(
            "Migrating {} snapshot v{} -> v{}",
            S::STORAGE_KEY,
            snapshot.version,
            S::SCHEMA_VERSION
        );
        S::migrate(snapshot.version, snapshot.payload)?
    } else {
        snapshot.payload
    };

    Ok(serde_json::from_value(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStorage;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct ToyState {
        items: Vec<String>,
    }

    impl PersistentState for ToyState {
        const STORAGE_KEY: &'static str = "toy.v-state";
        const SCHEMA_VERSION: u32 = 1;
    }

    #[tokio::test]
    async fn test_load_missing_yields_default() {
        let storage = MemoryKeyValueStorage::new();
        let state: ToyState = load_store(&storage).await;
        assert_eq!(state, ToyState::default());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() -> anyhow::Result<()> {
        let storage = MemoryKeyValueStorage::new();
        let state = ToyState {
            items: vec!["a".to_string(), "b".to_string()],
        };
        save_store(&storage, &state).await?;

        let restored: ToyState = load_store(&storage).await;
        assert_eq!(restored, state);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_default() -> anyhow::Result<()> {
        let storage = MemoryKeyValueStorage::new();
        storage.set(ToyState::STORAGE_KEY, "not json at all").await?;

        let state: ToyState = load_store(&storage).await;
        assert_eq!(state, ToyState::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_newer_snapshot_falls_back_to_default() -> anyhow::Result<()> {
        let storage = MemoryKeyValueStorage::new();
        let snapshot = VersionedSnapshot {
            version: 42,
            payload: serde_json::json!({"items": []}),
        };
        storage
            .set(ToyState::STORAGE_KEY, &snapshot.to_storage_string()?)
            .await?;

        let state: ToyState = load_store(&storage).await;
        assert_eq!(state, ToyState::default());
        Ok(())
    }
}
