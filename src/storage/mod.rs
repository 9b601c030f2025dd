//! 永続化キー・バリューストレージアダプタ
//!
//! すべてのストアはここで定義する非同期get/set/remove契約を通して
//! 状態スナップショットを保存・復元する。部分書き込みはなく、
//! ストアごとに1キーへ全状態を書き込む。

pub mod memory;
pub mod snapshot;
pub mod sqlite;

pub use memory::MemoryKeyValueStorage;
pub use snapshot::VersionedSnapshot;
pub use sqlite::SqliteKeyValueStorage;

use async_trait::async_trait;

use crate::error::StateResult;

/// ストアごとの永続化キー名前空間
pub mod keys {
    /// チャットストアの状態スナップショット
    pub const CHAT_STATE: &str = "fancast.chat.v-state";
    /// アナリティクスストアの状態スナップショット
    pub const ANALYTICS_STATE: &str = "fancast.analytics.v-state";
    /// ニュース/イベントストアの状態スナップショット
    pub const NEWS_STATE: &str = "fancast.news.v-state";
}

/// 非同期キー・バリューストレージ契約
///
/// 実装はプラットフォームストレージ（SQLiteファイル、インメモリ等）を
/// ラップする。値は常に文字列化されたスナップショット。
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// キーに対応する値を取得（存在しなければNone）
    async fn get(&self, key: &str) -> StateResult<Option<String>>;

    /// キーに値を書き込み（既存値は上書き）
    async fn set(&self, key: &str, value: &str) -> StateResult<()>;

    /// キーを削除（存在しなくてもエラーにしない）
    async fn remove(&self, key: &str) -> StateResult<()>;
}
