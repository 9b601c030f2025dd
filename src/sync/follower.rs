//! フォロー関係同期ヘルパー
//!
//! ローカルで適用済みのフォロー/アンフォローをバックエンドへミラーする。
//! 戻り値はboolで、falseはリモート反映に失敗してアウトボックスに
//! 残っていることを意味する。例外は投げない。
//!
//! サンプル/シードID（UUID形式でないID）はバックエンドに行が存在しない
//! ため、ネットワーク呼び出しなしで成功として扱う。

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::BackendRowClient;
use super::outbox::{OutboxEntry, SyncOp, SyncOutbox};
use super::RelationKind;

/// フォロー同期ヘルパー本体
pub struct FollowerSync {
    client: Arc<dyn BackendRowClient>,
    outbox: Mutex<SyncOutbox>,
}

impl FollowerSync {
    pub fn new(client: Arc<dyn BackendRowClient>) -> Self {
        Self {
            client,
            outbox: Mutex::new(SyncOutbox::new()),
        }
    }

    // --- 関係種別ごとのエントリポイント ---

    pub async fn sync_follow_streamer(&self, user_id: &str, streamer_id: &str) -> bool {
        self.sync_follow(RelationKind::StreamerFollower, user_id, streamer_id)
            .await
    }

    pub async fn sync_unfollow_streamer(&self, user_id: &str, streamer_id: &str) -> bool {
        self.sync_unfollow(RelationKind::StreamerFollower, user_id, streamer_id)
            .await
    }

    pub async fn sync_follow_user(&self, follower_id: &str, following_id: &str) -> bool {
        self.sync_follow(RelationKind::UserRelationship, follower_id, following_id)
            .await
    }

    pub async fn sync_unfollow_user(&self, follower_id: &str, following_id: &str) -> bool {
        self.sync_unfollow(RelationKind::UserRelationship, follower_id, following_id)
            .await
    }

    pub async fn sync_follow_artist(&self, user_id: &str, artist_id: &str) -> bool {
        self.sync_follow(RelationKind::ArtistFollower, user_id, artist_id)
            .await
    }

    pub async fn sync_unfollow_artist(&self, user_id: &str, artist_id: &str) -> bool {
        self.sync_unfollow(RelationKind::ArtistFollower, user_id, artist_id)
            .await
    }

    // --- 共通経路 ---

    /// フォローをリモートへ反映する
    pub async fn sync_follow(&self, kind: RelationKind, left_id: &str, right_id: &str) -> bool {
        self.sync(kind, SyncOp::Follow, left_id, right_id).await
    }

    /// アンフォローをリモートへ反映する
    pub async fn sync_unfollow(&self, kind: RelationKind, left_id: &str, right_id: &str) -> bool {
        self.sync(kind, SyncOp::Unfollow, left_id, right_id).await
    }

    async fn sync(&self, kind: RelationKind, op: SyncOp, left_id: &str, right_id: &str) -> bool {
        // サンプルIDガード: どちらかがUUID形式でなければローカル専用
        if !is_backend_id(left_id) || !is_backend_id(right_id) {
            debug!(
                "Skipping {} sync for sample identity ({}, {})",
                kind.table(),
                left_id,
                right_id
            );
            return true;
        }

        let entry_id = self.outbox.lock().enqueue(kind, op, left_id, right_id);
        self.attempt_entry(&entry_id, kind, op, left_id, right_id)
            .await
    }

    /// pendingのエントリをすべて再試行し、捌けた件数を返す
    pub async fn retry_pending(&self) -> usize {
        let pending: Vec<OutboxEntry> = self.outbox.lock().pending();
        let mut drained = 0;

        for entry in pending {
            if self
                .attempt_entry(&entry.id, entry.kind, entry.op, &entry.left_id, &entry.right_id)
                .await
            {
                drained += 1;
            }
        }
        drained
    }

    /// アウトボックスに残っている件数
    pub fn pending_count(&self) -> usize {
        self.outbox.lock().pending_count()
    }

    async fn attempt_entry(
        &self,
        entry_id: &str,
        kind: RelationKind,
        op: SyncOp,
        left_id: &str,
        right_id: &str,
    ) -> bool {
        self.outbox.lock().record_attempt(entry_id);

        let (left_column, right_column) = kind.columns();
        let result = match op {
            SyncOp::Follow => {
                let row = serde_json::json!({
                    left_column: left_id,
                    right_column: right_id,
                });
                self.client.insert_row(kind.table(), row).await
            }
            SyncOp::Unfollow => {
                self.client
                    .delete_rows(kind.table(), &[(left_column, left_id), (right_column, right_id)])
                    .await
            }
        };

        match result {
            Ok(()) => {
                self.outbox.lock().mark_done(entry_id);
                true
            }
            // 重複フォローは成功として読み替える（冪等性）
            Err(e) if op == SyncOp::Follow && e.is_unique_violation() => {
                debug!("Duplicate {} relationship treated as success", kind.table());
                self.outbox.lock().mark_done(entry_id);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to sync {} {:?} ({}, {}): {}",
                    kind.table(),
                    op,
                    left_id,
                    right_id,
                    e
                );
                false
            }
        }
    }
}

/// バックエンドに実在しうるID（UUID形式）かどうか
fn is_backend_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_backend_id() {
        assert!(is_backend_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_backend_id("not-a-uuid"));
        assert!(!is_backend_id("sample-streamer-1"));
        assert!(!is_backend_id(""));
    }
}
