//! チャットストア
//!
//! 配信チャットルーム・チャットメッセージ・DM会話を1ストアで管理する。
//! ルームは配信者ごとに1つで物理削除しない。メッセージは追記専用で、
//! 取得時の並びは挿入順（タイムスタンプ順ではない）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PersistentState;

/// チャットルームID接頭辞（外部互換のため固定）
const CHAT_ROOM_ID_PREFIX: &str = "chat_room_";

/// 配信者IDからチャットルームIDを導出する
pub fn chat_room_id_for(streamer_id: &str) -> String {
    format!("{}{}", CHAT_ROOM_ID_PREFIX, streamer_id)
}

/// 2者のユーザーIDから会話IDを導出する
///
/// 辞書順にソートしてハイフン結合するため、どちら方向から呼んでも
/// 同じ会話に解決される。
pub fn conversation_id_for(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}-{}", first, second)
}

/// 配信チャットルーム
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRoom {
    pub id: String,
    pub streamer_id: String,
    pub streamer_name: String,
    pub is_active: bool,
    pub participant_count: u32,
    pub created_at: DateTime<Utc>,
}

/// チャットメッセージ種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageKind {
    Text,
    Emote,
    System,
}

/// 配信チャットメッセージ（追記専用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub chat_room_id: String,
    pub user_id: String,
    pub username: String,
    pub user_avatar: Option<String>,
    pub user_tier: String,
    pub body: String,
    pub kind: ChatMessageKind,
    pub emote: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// DM会話
///
/// participant_a/bは会話ID導出と同じ辞書順で格納する。相手側の
/// 名前・アバターは、その参加者が初めて送信側に回るまで空のまま
/// （送信時に受信者プロフィールを引かないための意図的な非対称）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub participant_a_name: String,
    pub participant_b_name: String,
    pub participant_a_avatar: Option<String>,
    pub participant_b_avatar: Option<String>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u32,
}

/// ダイレクトメッセージ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// ルーム再有効化時の表示名の扱い
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomRenamePolicy {
    /// 既存ルームの名前を維持する（オリジナル挙動）
    #[default]
    KeepExisting,
    /// 再有効化時に渡された名前で更新する
    UpdateName,
}

/// 永続化されるチャット状態
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatState {
    pub rooms: Vec<ChatRoom>,
    pub messages: Vec<ChatMessage>,
    pub conversations: Vec<Conversation>,
    pub direct_messages: Vec<DirectMessage>,
}

impl PersistentState for ChatState {
    const STORAGE_KEY: &'static str = crate::storage::keys::CHAT_STATE;
    const SCHEMA_VERSION: u32 = 1;
}

/// チャットストア本体
#[derive(Debug, Default)]
pub struct ChatStore {
    state: ChatState,
    rename_policy: RoomRenamePolicy,
}

impl ChatStore {
    pub fn new(rename_policy: RoomRenamePolicy) -> Self {
        Self {
            state: ChatState::default(),
            rename_policy,
        }
    }

    /// 復元した状態からストアを構築する
    pub fn from_state(state: ChatState, rename_policy: RoomRenamePolicy) -> Self {
        Self {
            state,
            rename_policy,
        }
    }

    /// 永続化用に現在の状態を参照する
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    // --- ルーム操作 ---

    /// チャットルームを作成する（冪等）
    ///
    /// 同じ配信者のルームが既にあれば再有効化して返す。表示名の扱いは
    /// `RoomRenamePolicy`に従う。
    pub fn create_chat_room(&mut self, streamer_id: &str, streamer_name: &str) -> ChatRoom {
        let room_id = chat_room_id_for(streamer_id);

        if let Some(room) = self.state.rooms.iter_mut().find(|r| r.id == room_id) {
            room.is_active = true;
            if self.rename_policy == RoomRenamePolicy::UpdateName {
                room.streamer_name = streamer_name.to_string();
            }
            return room.clone();
        }

        let room = ChatRoom {
            id: room_id,
            streamer_id: streamer_id.to_string(),
            streamer_name: streamer_name.to_string(),
            is_active: true,
            participant_count: 0,
            created_at: Utc::now(),
        };
        debug!("Created chat room {}", room.id);
        self.state.rooms.push(room.clone());
        room
    }

    pub fn chat_room(&self, room_id: &str) -> Option<&ChatRoom> {
        self.state.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn chat_room_for_streamer(&self, streamer_id: &str) -> Option<&ChatRoom> {
        self.chat_room(&chat_room_id_for(streamer_id))
    }

    /// ルームの有効フラグを切り替える（物理削除はしない）
    pub fn set_room_active(&mut self, room_id: &str, is_active: bool) {
        if let Some(room) = self.state.rooms.iter_mut().find(|r| r.id == room_id) {
            room.is_active = is_active;
        }
    }

    /// 参加者数をインクリメントする（上限なし）
    pub fn increment_participant_count(&mut self, room_id: &str) {
        if let Some(room) = self.state.rooms.iter_mut().find(|r| r.id == room_id) {
            room.participant_count += 1;
        }
    }

    /// 参加者数をデクリメントする（0で飽和）
    pub fn decrement_participant_count(&mut self, room_id: &str) {
        if let Some(room) = self.state.rooms.iter_mut().find(|r| r.id == room_id) {
            room.participant_count = room.participant_count.saturating_sub(1);
        }
    }

    // --- 配信チャットメッセージ ---

    /// テキストメッセージを送信する
    #[allow(clippy::too_many_arguments)]
    pub fn send_chat_message(
        &mut self,
        room_id: &str,
        user_id: &str,
        username: &str,
        user_avatar: Option<&str>,
        user_tier: &str,
        body: &str,
    ) -> ChatMessage {
        self.push_message(
            room_id,
            user_id,
            username,
            user_avatar,
            user_tier,
            body,
            ChatMessageKind::Text,
            None,
        )
    }

    /// エモートメッセージを送信する
    #[allow(clippy::too_many_arguments)]
    pub fn send_emote_message(
        &mut self,
        room_id: &str,
        user_id: &str,
        username: &str,
        user_avatar: Option<&str>,
        user_tier: &str,
        emote: &str,
    ) -> ChatMessage {
        self.push_message(
            room_id,
            user_id,
            username,
            user_avatar,
            user_tier,
            emote,
            ChatMessageKind::Emote,
            Some(emote),
        )
    }

    /// システムメッセージを追加する
    pub fn push_system_message(&mut self, room_id: &str, body: &str) -> ChatMessage {
        self.push_message(
            room_id,
            "system",
            "System",
            None,
            "system",
            body,
            ChatMessageKind::System,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_message(
        &mut self,
        room_id: &str,
        user_id: &str,
        username: &str,
        user_avatar: Option<&str>,
        user_tier: &str,
        body: &str,
        kind: ChatMessageKind,
        emote: Option<&str>,
    ) -> ChatMessage {
        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            chat_room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            user_avatar: user_avatar.map(str::to_string),
            user_tier: user_tier.to_string(),
            body: body.to_string(),
            kind,
            emote: emote.map(str::to_string),
            created_at: Utc::now(),
        };
        self.state.messages.push(message.clone());
        message
    }

    /// ルームのメッセージ一覧を挿入順で取得する
    pub fn chat_messages(&self, room_id: &str) -> Vec<ChatMessage> {
        self.state
            .messages
            .iter()
            .filter(|m| m.chat_room_id == room_id)
            .cloned()
            .collect()
    }

    // --- DM ---

    /// ダイレクトメッセージを送信する
    ///
    /// 会話がなければ送信者側の情報のみで新規作成する。受信者の
    /// 名前・アバターは受信者が初めて返信したときに埋まる。
    pub fn send_direct_message(
        &mut self,
        sender_id: &str,
        sender_name: &str,
        sender_avatar: Option<&str>,
        receiver_id: &str,
        body: &str,
    ) -> DirectMessage {
        let conversation_id = conversation_id_for(sender_id, receiver_id);
        let now = Utc::now();

        match self
            .state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            Some(conversation) => {
                conversation.last_message = body.to_string();
                conversation.last_message_at = now;
                conversation.unread_count += 1;

                // 送信者スロットが空なら埋める（初返信で非対称が解消される）
                if conversation.participant_a == sender_id {
                    if conversation.participant_a_name.is_empty() {
                        conversation.participant_a_name = sender_name.to_string();
                    }
                    if conversation.participant_a_avatar.is_none() {
                        conversation.participant_a_avatar = sender_avatar.map(str::to_string);
                    }
                } else {
                    if conversation.participant_b_name.is_empty() {
                        conversation.participant_b_name = sender_name.to_string();
                    }
                    if conversation.participant_b_avatar.is_none() {
                        conversation.participant_b_avatar = sender_avatar.map(str::to_string);
                    }
                }
            }
            None => {
                let (first, second) = if sender_id <= receiver_id {
                    (sender_id, receiver_id)
                } else {
                    (receiver_id, sender_id)
                };
                let sender_is_first = first == sender_id;
                let conversation = Conversation {
                    id: conversation_id.clone(),
                    participant_a: first.to_string(),
                    participant_b: second.to_string(),
                    participant_a_name: if sender_is_first {
                        sender_name.to_string()
                    } else {
                        String::new()
                    },
                    participant_b_name: if sender_is_first {
                        String::new()
                    } else {
                        sender_name.to_string()
                    },
                    participant_a_avatar: if sender_is_first {
                        sender_avatar.map(str::to_string)
                    } else {
                        None
                    },
                    participant_b_avatar: if sender_is_first {
                        None
                    } else {
                        sender_avatar.map(str::to_string)
                    },
                    last_message: body.to_string(),
                    last_message_at: now,
                    unread_count: 1,
                };
                debug!("Created conversation {}", conversation.id);
                self.state.conversations.push(conversation);
            }
        }

        let message = DirectMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            body: body.to_string(),
            created_at: now,
        };
        self.state.direct_messages.push(message.clone());
        message
    }

    /// 2者間の会話を取得する（引数の順序に依存しない）
    pub fn conversation(&self, a: &str, b: &str) -> Option<&Conversation> {
        let id = conversation_id_for(a, b);
        self.state.conversations.iter().find(|c| c.id == id)
    }

    /// あるユーザーが参加している会話一覧（最終メッセージの新しい順）
    pub fn conversations_for(&self, user_id: &str) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> = self
            .state
            .conversations
            .iter()
            .filter(|c| c.participant_a == user_id || c.participant_b == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|x, y| y.last_message_at.cmp(&x.last_message_at));
        conversations
    }

    /// 会話のDM一覧を挿入順で取得する
    pub fn direct_messages(&self, conversation_id: &str) -> Vec<DirectMessage> {
        self.state
            .direct_messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    /// 会話を既読にする（未読カウントを一括リセット）
    pub fn mark_conversation_read(&mut self, conversation_id: &str) {
        if let Some(conversation) = self
            .state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.unread_count = 0;
        }
    }

    /// ユーザーの未読合計を取得する
    pub fn total_unread_for(&self, user_id: &str) -> u32 {
        self.state
            .conversations
            .iter()
            .filter(|c| c.participant_a == user_id || c.participant_b == user_id)
            .map(|c| c.unread_count)
            .sum()
    }
}
