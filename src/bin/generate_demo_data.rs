//! デモ用の状態データを生成してストレージファイルへ書き込むツール

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fancast_state::{
    load_store, save_store, AnalyticsState, AnalyticsStore, ChatState, ChatStore, NewsState,
    NewsStore, SqliteKeyValueStorage, StateConfig,
};

#[derive(Parser, Debug)]
#[command(name = "generate_demo_data", about = "Seed a fancast state file with demo data")]
struct Args {
    /// デモデータを紐付ける配信者ID
    #[arg(long, default_value = "demo-streamer")]
    streamer_id: String,

    /// 生成する分析履歴の日数
    #[arg(long, default_value_t = 30)]
    days: u32,

    /// 出力先のストレージファイル（未指定なら設定のデフォルトパス）
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = StateConfig::load().await;
    let storage_path = match &args.output {
        Some(path) => path.clone(),
        None => config.storage_path()?,
    };
    let storage = SqliteKeyValueStorage::open(&storage_path)?;
    tracing::info!("Seeding demo data into {:?}", storage_path);

    // 既存状態があれば引き継いで追記する
    let mut analytics = AnalyticsStore::from_state(load_store::<AnalyticsState>(&storage).await);
    let mut chat = ChatStore::from_state(
        load_store::<ChatState>(&storage).await,
        config.room_rename_policy,
    );
    let mut news = NewsStore::from_state(load_store::<NewsState>(&storage).await);

    analytics.generate_mock_analytics(&args.streamer_id, args.days);

    let room = chat.create_chat_room(&args.streamer_id, "Demo Streamer");
    chat.push_system_message(&room.id, "Welcome to the demo chat!");
    chat.send_chat_message(&room.id, "demo-user-1", "DemoFan", None, "free", "First!");
    chat.send_emote_message(&room.id, "demo-user-2", "EmoteEnjoyer", None, "vip", "hype");
    chat.increment_participant_count(&room.id);
    chat.increment_participant_count(&room.id);

    let now = chrono::Utc::now();
    let pinned = news.add_news(
        "Platform launch week",
        "Everything you need to know about launch week.",
        "announcements",
        None,
        now - chrono::Duration::days(2),
    );
    news.set_news_pinned(&pinned.id, true);
    news.add_news(
        "Creator spotlight",
        "Meet this week's featured creators.",
        "community",
        None,
        now - chrono::Duration::days(1),
    );
    news.add_event(
        "Summer showdown",
        "Community tournament finals.",
        Some("Rift Clash"),
        now + chrono::Duration::days(7),
        None,
        Some("Online"),
    );

    save_store(&storage, analytics.state()).await?;
    save_store(&storage, chat.state()).await?;
    save_store(&storage, news.state()).await?;

    let summary = analytics.analytics_summary(&args.streamer_id);
    println!("Seeded demo data for streamer '{}':", args.streamer_id);
    println!("  sessions:        {}", summary.total_streams);
    println!("  total minutes:   {}", summary.total_minutes);
    println!("  peak viewers:    {}", summary.peak_viewers);
    println!("  chat messages:   {}", chat.chat_messages(&room.id).len());
    println!("  active news:     {}", news.active_news().len());
    println!("  upcoming events: {}", news.upcoming_events(now).len());

    Ok(())
}
