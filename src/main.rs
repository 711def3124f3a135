use candlebot::db::{InMemoryTradeStore, PostgresTradeStore, TradeStore};
use candlebot::execution::{
    AggregatorConfig, CandleAggregator, DecisionPipeline, PositionLifecycle,
};
use candlebot::feed::{self, KrakenTradeFeed};
use candlebot::gateway::{OrderGateway, PaperGateway};
use candlebot::notify::{LogNotifier, Notifier, TelegramNotifier};
use candlebot::settings::Settings;
use candlebot::strategy::DecisionEngine;
use candlebot::{Candle, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Candle scoring trading bot for a single futures symbol")]
struct Cli {
    /// Instrument to trade (overrides BOT_SYMBOL)
    #[arg(long)]
    symbol: Option<String>,

    /// Candle interval in seconds (overrides BOT_CANDLE_INTERVAL_SECS)
    #[arg(long)]
    interval: Option<i64>,

    /// Score raw candles instead of Heikin-Ashi
    #[arg(long)]
    no_heikin_ashi: bool,

    /// Also keep the trade log in memory and notifications in the log
    /// (orders always go through the paper gateway)
    #[arg(long)]
    paper: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(symbol) = cli.symbol {
        settings.symbol = symbol;
    }
    if let Some(interval) = cli.interval {
        settings.candle_interval_secs = interval;
        settings.timeout_check_secs = interval.max(0) as u64 + 1;
    }
    if cli.no_heikin_ashi {
        settings.use_heikin_ashi = false;
    }
    settings.validate()?;

    setup_logging(&settings.log_filter);

    tracing::info!("🚀 Candlebot starting");
    tracing::info!("  Symbol: {}", settings.symbol);
    tracing::info!("  Interval: {}s", settings.candle_interval_secs);
    tracing::info!("  Heikin-Ashi: {}", settings.use_heikin_ashi);
    tracing::info!("  Score threshold: {}", settings.score_threshold);
    tracing::info!("  Order size: {}", settings.order_size);

    let store = build_store(&settings, cli.paper).await;
    let notifier = build_notifier(&settings, cli.paper);
    let gateway: Arc<dyn OrderGateway> = Arc::new(PaperGateway::new());

    let (trade_tx, trade_rx) = mpsc::channel(settings.trade_channel_capacity);
    let (candle_tx, candle_rx) = mpsc::unbounded_channel::<Candle>();

    let aggregator = CandleAggregator::new(
        AggregatorConfig {
            symbol: settings.symbol.clone(),
            interval_secs: settings.candle_interval_secs,
            heikin_ashi: settings.use_heikin_ashi,
            history_capacity: settings.window_capacity,
        },
        move |candle| {
            if candle_tx.send(candle).is_err() {
                tracing::error!("Decision pipeline is gone, dropping candle");
            }
        },
    );

    let lifecycle =
        PositionLifecycle::new(settings.lifecycle_config(), gateway, store, notifier.clone());
    let pipeline = DecisionPipeline::new(DecisionEngine::new(settings.scoring_config()), lifecycle);

    tracing::info!("\n🔄 Spawning tasks...");

    let feed_task = {
        let feed = KrakenTradeFeed::new(&settings.ws_url, &settings.symbol);
        tokio::spawn(async move {
            if let Err(e) = feed.run(trade_tx).await {
                tracing::error!("Trade feed failed: {:#}", e);
            }
        })
    };

    let ingest_task = tokio::spawn(feed::ingest_loop(aggregator.clone(), trade_rx));

    let timeout_task = tokio::spawn(feed::timeout_loop(
        aggregator,
        Duration::from_secs(settings.timeout_check_secs),
    ));

    let pipeline_task = tokio::spawn(pipeline.run(candle_rx));

    if let Err(e) = notifier
        .send_message(&format!("🤖 Bot started on {}", settings.symbol))
        .await
    {
        tracing::warn!("Startup notification failed: {}", e);
    }

    tracing::info!("✅ All tasks spawned");
    tracing::info!("\nPress Ctrl+C to stop...\n");

    // Wait for Ctrl+C or task exit
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
        }
        result = feed_task => {
            tracing::error!("Trade feed exited: {:?}", result);
        }
        result = ingest_task => {
            tracing::error!("Ingest loop exited: {:?}", result);
        }
        result = timeout_task => {
            tracing::error!("Timeout loop exited: {:?}", result);
        }
        result = pipeline_task => {
            tracing::error!("Decision pipeline exited: {:?}", result);
        }
    }

    tracing::info!("👋 Candlebot stopped");
    Ok(())
}

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn build_store(settings: &Settings, paper: bool) -> Arc<dyn TradeStore> {
    let database_url = match (&settings.database_url, paper) {
        (Some(url), false) => url,
        _ => {
            tracing::info!("Trade log kept in memory");
            return Arc::new(InMemoryTradeStore::new());
        }
    };

    match PostgresTradeStore::new(database_url).await {
        Ok(store) => {
            tracing::info!("Postgres trade log enabled");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect to Postgres ({}), keeping trades in memory",
                e
            );
            Arc::new(InMemoryTradeStore::new())
        }
    }
}

fn build_notifier(settings: &Settings, paper: bool) -> Arc<dyn Notifier> {
    let credentials = settings.telegram_credentials().filter(|_| !paper);

    match credentials.map(|(token, chat_id)| TelegramNotifier::new(&token, &chat_id)) {
        Some(Ok(telegram)) => {
            tracing::info!("Telegram notifications enabled");
            Arc::new(telegram)
        }
        Some(Err(e)) => {
            tracing::warn!("Telegram client unavailable ({}), logging notifications", e);
            Arc::new(LogNotifier)
        }
        None => Arc::new(LogNotifier),
    }
}
