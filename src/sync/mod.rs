//! バックエンド同期レイヤー
//!
//! ローカルのフォロー関係をバックエンドの結合テーブルへベストエフォートで
//! ミラーする。ローカル変更は即時反映・リモート書き込みは非同期という
//! 前提のため、失敗した書き込みはアウトボックスに残して再試行する。

pub mod backend;
pub mod follower;
pub mod outbox;

pub use backend::{BackendError, BackendRowClient, HttpBackendClient};
pub use follower::FollowerSync;
pub use outbox::{OutboxEntry, SyncOp, SyncOutbox};

use serde::{Deserialize, Serialize};

/// 同期対象の関係種別
///
/// それぞれバックエンドの結合テーブル1つに対応する。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// ユーザー → 配信者
    StreamerFollower,
    /// ユーザー → ユーザー
    UserRelationship,
    /// ユーザー → アーティスト
    ArtistFollower,
}

impl RelationKind {
    /// バックエンドのテーブル名
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::StreamerFollower => "streamer_followers",
            RelationKind::UserRelationship => "user_relationships",
            RelationKind::ArtistFollower => "artist_followers",
        }
    }

    /// (左カラム, 右カラム)のペア
    pub fn columns(&self) -> (&'static str, &'static str) {
        match self {
            RelationKind::StreamerFollower => ("user_id", "streamer_id"),
            RelationKind::UserRelationship => ("follower_id", "following_id"),
            RelationKind::ArtistFollower => ("user_id", "artist_id"),
        }
    }
}
