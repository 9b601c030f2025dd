//! 同期アウトボックス
//!
//! リモート書き込みを試みる前に意図した変更をキューへ積み、成功したら
//! 取り除く。失敗分はpendingのまま残り、`FollowerSync::retry_pending`で
//! 再試行される。これがローカル/リモートの乖離に対する回復経路。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RelationKind;

/// 同期操作の種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Follow,
    Unfollow,
}

/// キューに積まれた1件の同期意図
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboxEntry {
    pub id: String,
    pub kind: RelationKind,
    pub op: SyncOp,
    pub left_id: String,
    pub right_id: String,
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
}

/// FIFOのアウトボックス
#[derive(Debug, Default)]
pub struct SyncOutbox {
    entries: VecDeque<OutboxEntry>,
}

impl SyncOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 意図をキューへ積み、エントリIDを返す
    pub fn enqueue(&mut self, kind: RelationKind, op: SyncOp, left_id: &str, right_id: &str) -> String {
        let entry = OutboxEntry {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            op,
            left_id: left_id.to_string(),
            right_id: right_id.to_string(),
            attempts: 0,
            queued_at: Utc::now(),
        };
        let id = entry.id.clone();
        self.entries.push_back(entry);
        id
    }

    /// 試行回数を記録する
    pub fn record_attempt(&mut self, entry_id: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == entry_id) {
            entry.attempts += 1;
        }
    }

    /// 成功したエントリを取り除く
    pub fn mark_done(&mut self, entry_id: &str) {
        self.entries.retain(|e| e.id != entry_id);
    }

    /// pendingのエントリ一覧（キュー順）
    pub fn pending(&self) -> Vec<OutboxEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}
