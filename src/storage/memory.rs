//! インメモリのキー・バリューストレージ実装（テスト・一時利用向け）

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StateResult;

use super::KeyValueStorage;

/// HashMapベースの揮発性ストレージ
#[derive(Default)]
pub struct MemoryKeyValueStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存されているキー数を取得
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryKeyValueStorage {
    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StateResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StateResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
