//! バージョン付きスナップショットエンベロープ
//!
//! 永続化される状態は必ず`{version, payload}`の形でラップする。
//! レコード構造が変わった場合は各ストアの`migrate`で旧バージョンの
//! payloadを現行形式へ変換してから復元する。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StateError, StateResult};

/// 永続化エンベロープ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedSnapshot {
    /// スナップショットのスキーマバージョン
    pub version: u32,
    /// ストア状態のJSON表現
    pub payload: Value,
}

impl VersionedSnapshot {
    /// 状態をシリアライズしてエンベロープを作成
    pub fn encode<S: Serialize>(version: u32, state: &S) -> StateResult<Self> {
        Ok(Self {
            version,
            payload: serde_json::to_value(state)?,
        })
    }

    /// エンベロープを文字列化（ストレージに書く形式）
    pub fn to_storage_string(&self) -> StateResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// ストレージ上の文字列からエンベロープを復元
    pub fn from_storage_string(raw: &str) -> StateResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 現行バージョンより新しいスナップショットを拒否する
    pub fn ensure_not_newer(&self, current: u32) -> StateResult<()> {
        if self.version > current {
            return Err(StateError::UnsupportedVersion {
                found: self.version,
                current,
            });
        }
        Ok(())
    }
}
