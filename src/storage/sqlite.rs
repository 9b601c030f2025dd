//! SQLiteベースのキー・バリューストレージ実装

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{StateError, StateResult};

use super::KeyValueStorage;

const KV_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_entries (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLiteファイルを単一のキー・バリューテーブルとして使うストレージ
///
/// データ量はストアごとに1スナップショットなので、接続は
/// `parking_lot::Mutex`で保護した同期アクセスで十分。
pub struct SqliteKeyValueStorage {
    connection: Mutex<Connection>,
}

impl SqliteKeyValueStorage {
    /// 指定パスのデータベースファイルを開く（なければ作成）
    pub fn open<P: AsRef<Path>>(path: P) -> StateResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Storage(format!("Failed to create data dir: {}", e)))?;
        }

        let connection = Connection::open(path.as_ref())?;
        connection.execute_batch(KV_SCHEMA)?;

        tracing::debug!("KV storage opened: {:?}", path.as_ref());
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// インメモリデータベースを作成（テスト用）
    pub fn open_in_memory() -> StateResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(KV_SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// XDGデータディレクトリ配下のデフォルトのストレージパスを取得
    pub fn default_path() -> StateResult<PathBuf> {
        let project_dirs = ProjectDirs::from("app", "fancast", "fancast")
            .ok_or_else(|| StateError::Storage("Failed to get project directories".to_string()))?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| StateError::Storage(format!("Failed to create data dir: {}", e)))?;

        Ok(data_dir.join("state.db"))
    }

    /// 保存されているキー数を取得
    pub fn entry_count(&self) -> StateResult<usize> {
        let conn = self.connection.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl KeyValueStorage for SqliteKeyValueStorage {
    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        let conn = self.connection.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StateResult<()> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, updated_at],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StateResult<()> {
        let conn = self.connection.lock();
        conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}
