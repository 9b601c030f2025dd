//! ニュース/イベントストア
//!
//! 編集コンテンツ2種（ニュース記事・ゲームイベント)を1ストアで
//! 管理する。CRUDとフラグ切り替え、派生セレクタのみの単純な構成。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PersistentState;

/// ニュース記事
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_pinned: bool,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// ゲームイベント
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GamingEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub game: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

/// 永続化されるニュース/イベント状態
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewsState {
    pub news: Vec<NewsItem>,
    pub events: Vec<GamingEvent>,
}

impl PersistentState for NewsState {
    const STORAGE_KEY: &'static str = crate::storage::keys::NEWS_STATE;
    const SCHEMA_VERSION: u32 = 1;
}

/// ニュース/イベントストア本体
#[derive(Debug, Default)]
pub struct NewsStore {
    state: NewsState,
}

impl NewsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: NewsState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &NewsState {
        &self.state
    }

    // --- ニュース ---

    pub fn add_news(
        &mut self,
        title: &str,
        body: &str,
        category: &str,
        image_url: Option<&str>,
        published_at: DateTime<Utc>,
    ) -> NewsItem {
        let item = NewsItem {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
            image_url: image_url.map(str::to_string),
            is_active: true,
            is_pinned: false,
            published_at,
            created_at: Utc::now(),
        };
        self.state.news.push(item.clone());
        item
    }

    /// 記事をクロージャで更新する（存在すればtrue）
    pub fn update_news<F: FnOnce(&mut NewsItem)>(&mut self, id: &str, update: F) -> bool {
        match self.state.news.iter_mut().find(|n| n.id == id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    pub fn remove_news(&mut self, id: &str) {
        self.state.news.retain(|n| n.id != id);
    }

    pub fn set_news_active(&mut self, id: &str, is_active: bool) {
        self.update_news(id, |n| n.is_active = is_active);
    }

    pub fn set_news_pinned(&mut self, id: &str, is_pinned: bool) {
        self.update_news(id, |n| n.is_pinned = is_pinned);
    }

    pub fn news_item(&self, id: &str) -> Option<&NewsItem> {
        self.state.news.iter().find(|n| n.id == id)
    }

    /// 有効な記事一覧（ピン留め優先、次に公開日時の新しい順）
    pub fn active_news(&self) -> Vec<NewsItem> {
        let mut items: Vec<NewsItem> = self
            .state
            .news
            .iter()
            .filter(|n| n.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then(b.published_at.cmp(&a.published_at))
        });
        items
    }

    // --- イベント ---

    pub fn add_event(
        &mut self,
        title: &str,
        description: &str,
        game: Option<&str>,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        location: Option<&str>,
    ) -> GamingEvent {
        let event = GamingEvent {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            game: game.map(str::to_string),
            starts_at,
            ends_at,
            location: location.map(str::to_string),
            is_featured: false,
            created_at: Utc::now(),
        };
        self.state.events.push(event.clone());
        event
    }

    pub fn update_event<F: FnOnce(&mut GamingEvent)>(&mut self, id: &str, update: F) -> bool {
        match self.state.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                update(event);
                true
            }
            None => false,
        }
    }

    pub fn remove_event(&mut self, id: &str) {
        self.state.events.retain(|e| e.id != id);
    }

    pub fn set_event_featured(&mut self, id: &str, is_featured: bool) {
        self.update_event(id, |e| e.is_featured = is_featured);
    }

    pub fn event(&self, id: &str) -> Option<&GamingEvent> {
        self.state.events.iter().find(|e| e.id == id)
    }

    /// 開催予定イベント（開始日時の昇順）
    pub fn upcoming_events(&self, now: DateTime<Utc>) -> Vec<GamingEvent> {
        let mut events: Vec<GamingEvent> = self
            .state
            .events
            .iter()
            .filter(|e| e.starts_at >= now)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        events
    }

    /// 注目フラグ付きの開催予定イベント
    pub fn featured_events(&self, now: DateTime<Utc>) -> Vec<GamingEvent> {
        self.upcoming_events(now)
            .into_iter()
            .filter(|e| e.is_featured)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pinned_news_sorts_before_recent() {
        let mut store = NewsStore::new();
        let now = Utc::now();

        // 新しいがピン留めなし
        let newer = store.add_news("newer", "...", "general", None, now);
        // 古いがピン留めあり
        let older = store.add_news("older", "...", "general", None, now - Duration::days(3));
        store.set_news_pinned(&older.id, true);

        let active = store.active_news();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, older.id);
        assert_eq!(active[1].id, newer.id);
    }

    #[test]
    fn test_inactive_news_excluded() {
        let mut store = NewsStore::new();
        let item = store.add_news("a", "...", "general", None, Utc::now());
        store.set_news_active(&item.id, false);
        assert!(store.active_news().is_empty());
        // レコード自体は残る
        assert!(store.news_item(&item.id).is_some());
    }

    #[test]
    fn test_unpinned_news_sorted_by_recency() {
        let mut store = NewsStore::new();
        let now = Utc::now();
        store.add_news("old", "...", "general", None, now - Duration::days(2));
        store.add_news("new", "...", "general", None, now);
        store.add_news("mid", "...", "general", None, now - Duration::days(1));

        let titles: Vec<String> = store.active_news().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_upcoming_events_chronological() {
        let mut store = NewsStore::new();
        let now = Utc::now();

        store.add_event("past", "...", None, now - Duration::days(1), None, None);
        let far = store.add_event("far", "...", None, now + Duration::days(10), None, None);
        let near = store.add_event("near", "...", None, now + Duration::days(1), None, None);

        let upcoming = store.upcoming_events(now);
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].id, near.id);
        assert_eq!(upcoming[1].id, far.id);
    }

    #[test]
    fn test_featured_events_filter() {
        let mut store = NewsStore::new();
        let now = Utc::now();
        store.add_event("plain", "...", None, now + Duration::days(1), None, None);
        let featured = store.add_event("big", "...", Some("Rift Clash"), now + Duration::days(2), None, None);
        store.set_event_featured(&featured.id, true);

        let result = store.featured_events(now);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, featured.id);
    }

    #[test]
    fn test_update_and_remove_event() {
        let mut store = NewsStore::new();
        let event = store.add_event("t", "d", None, Utc::now() + Duration::days(1), None, None);

        assert!(store.update_event(&event.id, |e| e.title = "renamed".to_string()));
        assert_eq!(store.event(&event.id).unwrap().title, "renamed");

        store.remove_event(&event.id);
        assert!(store.event(&event.id).is_none());
        assert!(!store.update_event(&event.id, |_| {}));
    }
}
