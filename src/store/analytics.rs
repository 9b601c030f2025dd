//! アナリティクスストア
//!
//! 配信セッションのライフサイクル（開始・更新・終了）、日次集計、
//! 実績判定、サマリ投影を担当する。サマリは永続化された集計値を
//! 持たず、呼び出しごとにセッション一覧から再計算する純粋な投影。

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StateError, StateResult};

use super::PersistentState;

/// 配信セッション1回分のレコード
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamSession {
    pub id: String,
    pub streamer_id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub peak_viewers: u32,
    pub average_viewers: u32,
    pub total_messages: u32,
    pub new_followers: u32,
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// 日次集計の構造化キー（配信者ID + 日付）
///
/// 永続化形式は外部互換のためレガシーな複合文字列
/// `"{streamer_id}_{YYYY-MM-DD}"`のまま。日付部分にアンダースコアは
/// 含まれないため、最後の`_`での分割で一意に復元できる。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DailyStatsKey {
    pub streamer_id: String,
    pub date: NaiveDate,
}

impl DailyStatsKey {
    pub fn new(streamer_id: &str, date: NaiveDate) -> Self {
        Self {
            streamer_id: streamer_id.to_string(),
            date,
        }
    }

    /// レガシー複合文字列ID
    pub fn legacy_id(&self) -> String {
        format!("{}_{}", self.streamer_id, self.date.format("%Y-%m-%d"))
    }

    /// レガシー複合文字列IDからキーを復元する
    pub fn parse_legacy(id: &str) -> StateResult<Self> {
        let (streamer_id, date_part) = id.rsplit_once('_').ok_or_else(|| {
            StateError::Serialization(format!("Invalid daily stats id: {}", id))
        })?;
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| StateError::Serialization(format!("Invalid daily stats date: {}", e)))?;
        Ok(Self::new(streamer_id, date))
    }
}

impl Serialize for DailyStatsKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.legacy_id())
    }
}

impl<'de> Deserialize<'de> for DailyStatsKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DailyStatsKey::parse_legacy(&raw).map_err(D::Error::custom)
    }
}

/// 1配信者・1日分の集計レコード
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStats {
    pub streamer_id: String,
    pub date: NaiveDate,
    pub total_stream_minutes: u32,
    pub messages_received: u32,
    pub followers_gained: u32,
    pub peak_viewers: u32,
}

/// `record_daily_stats`でマージされる差分
///
/// 分・メッセージ・フォロワーは加算、ピーク視聴者は最大値を採る。
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyStatsDelta {
    pub stream_minutes: u32,
    pub messages: u32,
    pub followers: u32,
    pub peak_viewers: u32,
}

/// 実績が参照する6種の固定メトリクス
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementMetric {
    TotalStreams,
    TotalHours,
    PeakViewers,
    TotalMessages,
    TotalViews,
    FollowersGained30d,
}

/// 実績定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub metric: AchievementMetric,
    pub threshold: f64,
}

/// 組み込みの実績カタログ
pub fn default_achievements() -> Vec<Achievement> {
    fn achievement(
        id: &str,
        title: &str,
        description: &str,
        metric: AchievementMetric,
        threshold: f64,
    ) -> Achievement {
        Achievement {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            metric,
            threshold,
        }
    }

    vec![
        achievement(
            "first_stream",
            "First Stream",
            "Complete your first stream",
            AchievementMetric::TotalStreams,
            1.0,
        ),
        achievement(
            "marathon_runner",
            "Marathon Runner",
            "Stream for 100 hours in total",
            AchievementMetric::TotalHours,
            100.0,
        ),
        achievement(
            "crowd_pleaser",
            "Crowd Pleaser",
            "Reach 1,000 peak viewers",
            AchievementMetric::PeakViewers,
            1000.0,
        ),
        achievement(
            "chatterbox",
            "Chatterbox",
            "Receive 10,000 chat messages",
            AchievementMetric::TotalMessages,
            10000.0,
        ),
        achievement(
            "viral",
            "Going Viral",
            "Accumulate 100,000 views",
            AchievementMetric::TotalViews,
            100000.0,
        ),
        achievement(
            "rising_star",
            "Rising Star",
            "Gain 500 followers in 30 days",
            AchievementMetric::FollowersGained30d,
            500.0,
        ),
    ]
}

/// セッション一覧から導出されるサマリ投影
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub total_streams: usize,
    pub total_minutes: i64,
    pub average_minutes: f64,
    pub peak_viewers: u32,
    pub average_viewers: f64,
    pub total_messages: u64,
    /// 各配信のピーク視聴者数の合計（ユニーク視聴者数ではない近似値）
    pub total_views: u64,
    pub followers_gained_30d: u64,
    /// total_messages / total_views（total_views == 0のときは0）
    pub engagement_rate: f64,
}

/// 永続化されるアナリティクス状態
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsState {
    pub sessions: Vec<StreamSession>,
    pub daily: BTreeMap<DailyStatsKey, DailyStats>,
}

impl PersistentState for AnalyticsState {
    const STORAGE_KEY: &'static str = crate::storage::keys::ANALYTICS_STATE;
    const SCHEMA_VERSION: u32 = 1;

    /// v0は日次集計を複合文字列IDのフラット配列で持っていた
    fn migrate(version: u32, payload: Value) -> StateResult<Value> {
        if version != 0 {
            return Ok(payload);
        }

        let sessions = payload.get("sessions").cloned().unwrap_or(Value::Array(vec![]));
        let mut daily = serde_json::Map::new();

        if let Some(entries) = payload.get("daily_stats").and_then(Value::as_array) {
            for entry in entries {
                let Some(id) = entry.get("id").and_then(Value::as_str) else {
                    continue;
                };
                let Ok(key) = DailyStatsKey::parse_legacy(id) else {
                    tracing::warn!("Skipping unparseable daily stats id: {}", id);
                    continue;
                };

                let get_u32 =
                    |field: &str| entry.get(field).and_then(Value::as_u64).unwrap_or(0) as u32;
                let stats = DailyStats {
                    streamer_id: key.streamer_id.clone(),
                    date: key.date,
                    total_stream_minutes: get_u32("total_stream_minutes"),
                    messages_received: get_u32("messages_received"),
                    followers_gained: get_u32("followers_gained"),
                    peak_viewers: get_u32("peak_viewers"),
                };
                daily.insert(key.legacy_id(), serde_json::to_value(stats)?);
            }
        }

        Ok(serde_json::json!({
            "sessions": sessions,
            "daily": Value::Object(daily),
        }))
    }
}

/// アナリティクスストア本体
#[derive(Debug, Default)]
pub struct AnalyticsStore {
    state: AnalyticsState,
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: AnalyticsState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AnalyticsState {
        &self.state
    }

    // --- セッションライフサイクル ---

    /// 配信セッションを開始する（ended_atは未設定のまま）
    pub fn start_stream(&mut self, streamer_id: &str, title: &str) -> StreamSession {
        self.start_stream_on(streamer_id, title, None)
    }

    /// プラットフォーム指定付きでセッションを開始する
    pub fn start_stream_on(
        &mut self,
        streamer_id: &str,
        title: &str,
        platform: Option<&str>,
    ) -> StreamSession {
        let now = Utc::now();
        let session = StreamSession {
            id: uuid::Uuid::new_v4().to_string(),
            streamer_id: streamer_id.to_string(),
            title: title.to_string(),
            started_at: now,
            ended_at: None,
            duration_minutes: None,
            peak_viewers: 0,
            average_viewers: 0,
            total_messages: 0,
            new_followers: 0,
            platform: platform.map(str::to_string),
            created_at: now,
        };
        debug!("Started stream session {} for {}", session.id, streamer_id);
        self.state.sessions.push(session.clone());
        session
    }

    /// 進行中セッションのメトリクスを更新する
    ///
    /// ピーク視聴者数は単調増加（現在値がピークを下回っても減らない）。
    /// メッセージ数・フォロワー数は差分を加算する。平均視聴者数は
    /// `end_stream`で確定する。未知のセッションIDは無視される。
    pub fn update_stream_metrics(
        &mut self,
        session_id: &str,
        current_viewers: u32,
        messages_delta: u32,
        followers_delta: u32,
    ) {
        if let Some(session) = self.state.sessions.iter_mut().find(|s| s.id == session_id) {
            session.peak_viewers = session.peak_viewers.max(current_viewers);
            session.total_messages += messages_delta;
            session.new_followers += followers_delta;
        }
    }

    /// セッションを終了し、経過時間（分）を確定する
    pub fn end_stream(
        &mut self,
        session_id: &str,
        peak_viewers: u32,
        average_viewers: u32,
        total_messages: u32,
        new_followers: u32,
    ) -> Option<StreamSession> {
        let session = self.state.sessions.iter_mut().find(|s| s.id == session_id)?;
        let now = Utc::now();

        session.ended_at = Some(now);
        session.duration_minutes = Some((now - session.started_at).num_minutes());
        session.peak_viewers = session.peak_viewers.max(peak_viewers);
        session.average_viewers = average_viewers;
        session.total_messages = total_messages;
        session.new_followers = new_followers;

        info!(
            "Ended stream session {} ({} min)",
            session.id,
            session.duration_minutes.unwrap_or(0)
        );
        Some(session.clone())
    }

    pub fn session(&self, session_id: &str) -> Option<&StreamSession> {
        self.state.sessions.iter().find(|s| s.id == session_id)
    }

    /// 配信者のセッション一覧（挿入順）
    pub fn sessions_for(&self, streamer_id: &str) -> Vec<StreamSession> {
        self.state
            .sessions
            .iter()
            .filter(|s| s.streamer_id == streamer_id)
            .cloned()
            .collect()
    }

    /// 配信者のセッションと日次集計を一括削除する
    pub fn clear_streamer_analytics(&mut self, streamer_id: &str) {
        self.state.sessions.retain(|s| s.streamer_id != streamer_id);
        self.state.daily.retain(|k, _| k.streamer_id != streamer_id);
        info!("Cleared analytics for streamer {}", streamer_id);
    }

    // --- サマリ投影 ---

    /// 終了済みセッションからサマリを再計算する
    pub fn analytics_summary(&self, streamer_id: &str) -> AnalyticsSummary {
        let ended: Vec<&StreamSession> = self
            .state
            .sessions
            .iter()
            .filter(|s| s.streamer_id == streamer_id && s.is_ended())
            .collect();

        if ended.is_empty() {
            return AnalyticsSummary::default();
        }

        let total_streams = ended.len();
        let total_minutes: i64 = ended.iter().filter_map(|s| s.duration_minutes).sum();
        let peak_viewers = ended.iter().map(|s| s.peak_viewers).max().unwrap_or(0);
        let average_viewers =
            ended.iter().map(|s| s.average_viewers as f64).sum::<f64>() / total_streams as f64;
        let total_messages: u64 = ended.iter().map(|s| s.total_messages as u64).sum();
        let total_views: u64 = ended.iter().map(|s| s.peak_viewers as u64).sum();

        let cutoff = Utc::now() - Duration::days(30);
        let followers_gained_30d: u64 = ended
            .iter()
            .filter(|s| s.ended_at.map(|t| t >= cutoff).unwrap_or(false))
            .map(|s| s.new_followers as u64)
            .sum();

        let engagement_rate = if total_views == 0 {
            0.0
        } else {
            total_messages as f64 / total_views as f64
        };

        AnalyticsSummary {
            total_streams,
            total_minutes,
            average_minutes: total_minutes as f64 / total_streams as f64,
            peak_viewers,
            average_viewers,
            total_messages,
            total_views,
            followers_gained_30d,
            engagement_rate,
        }
    }

    // --- 日次集計 ---

    /// 日次集計をupsertマージする
    pub fn record_daily_stats(&mut self, streamer_id: &str, date: NaiveDate, delta: DailyStatsDelta) {
        let key = DailyStatsKey::new(streamer_id, date);
        self.state
            .daily
            .entry(key)
            .and_modify(|stats| {
                stats.total_stream_minutes += delta.stream_minutes;
                stats.messages_received += delta.messages;
                stats.followers_gained += delta.followers;
                stats.peak_viewers = stats.peak_viewers.max(delta.peak_viewers);
            })
            .or_insert_with(|| DailyStats {
                streamer_id: streamer_id.to_string(),
                date,
                total_stream_minutes: delta.stream_minutes,
                messages_received: delta.messages,
                followers_gained: delta.followers,
                peak_viewers: delta.peak_viewers,
            });
    }

    /// 配信者の直近`days`日分の日次集計を日付昇順で取得する
    pub fn daily_stats(&self, streamer_id: &str, days: usize) -> Vec<DailyStats> {
        let entries: Vec<DailyStats> = self
            .state
            .daily
            .iter()
            .filter(|(key, _)| key.streamer_id == streamer_id)
            .map(|(_, stats)| stats.clone())
            .collect();

        // BTreeMapキー順 = (streamer_id, date)順なのでここは日付昇順
        let skip = entries.len().saturating_sub(days);
        entries.into_iter().skip(skip).collect()
    }

    // --- 実績 ---

    /// 新たに閾値を満たした実績IDを返す（解除状態は変更しない）
    ///
    /// 組み込みカタログ（`default_achievements`）に対して判定する。
    /// 解除済みの永続化は呼び出し側（プロフィール層）の責務。
    pub fn check_achievements(&self, streamer_id: &str, unlocked: &HashSet<String>) -> Vec<String> {
        self.check_achievements_in(streamer_id, &default_achievements(), unlocked)
    }

    /// 任意の実績カタログに対して判定する
    pub fn check_achievements_in(
        &self,
        streamer_id: &str,
        achievements: &[Achievement],
        unlocked: &HashSet<String>,
    ) -> Vec<String> {
        let summary = self.analytics_summary(streamer_id);

        achievements
            .iter()
            .filter(|a| !unlocked.contains(&a.id))
            .filter(|a| {
                let value = match a.metric {
                    AchievementMetric::TotalStreams => summary.total_streams as f64,
                    AchievementMetric::TotalHours => summary.total_minutes as f64 / 60.0,
                    AchievementMetric::PeakViewers => summary.peak_viewers as f64,
                    AchievementMetric::TotalMessages => summary.total_messages as f64,
                    AchievementMetric::TotalViews => summary.total_views as f64,
                    AchievementMetric::FollowersGained30d => summary.followers_gained_30d as f64,
                };
                value >= a.threshold
            })
            .map(|a| a.id.clone())
            .collect()
    }

    // --- デモデータ生成 ---

    /// 過去`days`日分のもっともらしい分析履歴を生成する（デモ・テスト用）
    pub fn generate_mock_analytics(&mut self, streamer_id: &str, days: u32) {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        for day_offset in (1..=days).rev() {
            let started_at = now - Duration::days(day_offset as i64)
                + Duration::minutes(rng.gen_range(0..120));
            let duration_minutes = rng.gen_range(60..240) as i64;
            let peak_viewers = rng.gen_range(50..500);
            let average_viewers = (peak_viewers as f64 * rng.gen_range(0.4..0.8)) as u32;
            let total_messages = rng.gen_range(100..2000);
            let new_followers = rng.gen_range(0..25);

            let session = StreamSession {
                id: uuid::Uuid::new_v4().to_string(),
                streamer_id: streamer_id.to_string(),
                title: format!("Stream day {}", day_offset),
                started_at,
                ended_at: Some(started_at + Duration::minutes(duration_minutes)),
                duration_minutes: Some(duration_minutes),
                peak_viewers,
                average_viewers,
                total_messages,
                new_followers,
                platform: None,
                created_at: started_at,
            };
            self.state.sessions.push(session);

            self.record_daily_stats(
                streamer_id,
                started_at.date_naive(),
                DailyStatsDelta {
                    stream_minutes: duration_minutes as u32,
                    messages: total_messages,
                    followers: new_followers,
                    peak_viewers,
                },
            );
        }

        info!("Generated {} days of mock analytics for {}", days, streamer_id);
    }
}
