//! フォロー同期ヘルパーの統合テスト
//!
//! モッククライアントでガード・冪等性・アウトボックス再試行を検証する。

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use fancast_state::{BackendError, BackendRowClient, FollowerSync, RelationKind};

const USER_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";
const STREAMER_UUID: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e";

/// 呼び出しを記録し、設定に応じて失敗するモッククライアント
#[derive(Default)]
struct MockBackend {
    calls: Mutex<Vec<(String, String)>>,
    fail_with: Mutex<Option<BackendError>>,
}

impl MockBackend {
    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn set_failure(&self, error: Option<BackendError>) {
        *self.fail_with.lock() = error;
    }

    fn outcome(&self) -> Result<(), BackendError> {
        match self.fail_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BackendRowClient for MockBackend {
    async fn insert_row(&self, table: &str, _row: Value) -> Result<(), BackendError> {
        self.calls
            .lock()
            .push(("insert".to_string(), table.to_string()));
        self.outcome()
    }

    async fn delete_rows(&self, table: &str, _filters: &[(&str, &str)]) -> Result<(), BackendError> {
        self.calls
            .lock()
            .push(("delete".to_string(), table.to_string()));
        self.outcome()
    }
}

#[tokio::test]
async fn test_sample_identity_skips_network_and_succeeds() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    assert!(sync.sync_follow_streamer("not-a-uuid", "also-not-a-uuid").await);
    assert!(sync.sync_follow_streamer(USER_UUID, "sample-streamer-1").await);
    assert!(sync.sync_unfollow_artist("seed-user", STREAMER_UUID).await);

    // ネットワーク呼び出しなし、アウトボックスにも残らない
    assert_eq!(backend.call_count(), 0);
    assert_eq!(sync.pending_count(), 0);
}

#[tokio::test]
async fn test_follow_inserts_into_relation_table() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    assert!(sync.sync_follow_streamer(USER_UUID, STREAMER_UUID).await);
    assert!(sync.sync_follow_user(USER_UUID, STREAMER_UUID).await);
    assert!(sync.sync_unfollow_artist(USER_UUID, STREAMER_UUID).await);

    let calls = backend.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            ("insert".to_string(), "streamer_followers".to_string()),
            ("insert".to_string(), "user_relationships".to_string()),
            ("delete".to_string(), "artist_followers".to_string()),
        ]
    );
    assert_eq!(sync.pending_count(), 0);
}

#[tokio::test]
async fn test_duplicate_follow_is_treated_as_success() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    backend.set_failure(Some(BackendError::new(
        Some("23505".to_string()),
        "duplicate key value violates unique constraint",
    )));

    assert!(sync.sync_follow_streamer(USER_UUID, STREAMER_UUID).await);
    assert_eq!(sync.pending_count(), 0);
}

#[tokio::test]
async fn test_other_errors_report_failure_and_stay_pending() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    backend.set_failure(Some(BackendError::new(
        Some("42501".to_string()),
        "permission denied",
    )));

    assert!(!sync.sync_follow_streamer(USER_UUID, STREAMER_UUID).await);
    assert_eq!(sync.pending_count(), 1);

    // 失敗中の再試行では捌けない
    assert_eq!(sync.retry_pending().await, 0);
    assert_eq!(sync.pending_count(), 1);
}

#[tokio::test]
async fn test_retry_pending_drains_after_recovery() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    backend.set_failure(Some(BackendError::new(None, "connection refused")));
    assert!(!sync.sync_follow_streamer(USER_UUID, STREAMER_UUID).await);
    assert!(!sync.sync_unfollow_user(USER_UUID, STREAMER_UUID).await);
    assert_eq!(sync.pending_count(), 2);

    // バックエンド復旧後は全件捌ける
    backend.set_failure(None);
    assert_eq!(sync.retry_pending().await, 2);
    assert_eq!(sync.pending_count(), 0);
}

#[tokio::test]
async fn test_unfollow_conflict_is_not_reclassified() {
    let backend = Arc::new(MockBackend::default());
    let sync = FollowerSync::new(backend.clone());

    // 一意制約違反の読み替えはフォロー（挿入）経路だけ
    backend.set_failure(Some(BackendError::new(
        Some("23505".to_string()),
        "duplicate key value",
    )));

    assert!(!sync
        .sync_unfollow(RelationKind::StreamerFollower, USER_UUID, STREAMER_UUID)
        .await);
    assert_eq!(sync.pending_count(), 1);
}
