use candlebot::db::{PostgresTradeStore, TradeStore};
use candlebot::{ExitReason, Result, TradeRecord};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize closed trades from the Postgres trade log")]
struct Args {
    /// Only report this symbol (all symbols when omitted)
    #[arg(long)]
    symbol: Option<String>,

    /// Maximum number of recent trades to include per symbol
    #[arg(long, default_value = "100")]
    limit: usize,
}

#[derive(Debug, Default, PartialEq)]
struct Summary {
    trades: usize,
    wins: usize,
    total_pnl_pct: f64,
    opposing_exits: usize,
    gain_exits: usize,
}

impl Summary {
    fn from_trades(trades: &[TradeRecord]) -> Self {
        trades.iter().fold(Summary::default(), |mut s, t| {
            s.trades += 1;
            if t.pnl_percent > 0.0 {
                s.wins += 1;
            }
            s.total_pnl_pct += t.pnl_percent;
            match t.exit_reason {
                ExitReason::OpposingSignal => s.opposing_exits += 1,
                ExitReason::GainThreshold => s.gain_exits += 1,
            }
            s
        })
    }

    fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64 * 100.0
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("candlebot=warn")
        .init();

    let args = Args::parse();

    let database_url = std::env::var("BOT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| "BOT_DATABASE_URL or DATABASE_URL must be set")?;
    let store = PostgresTradeStore::new(&database_url).await?;

    let trades = match &args.symbol {
        Some(symbol) => store.trades_by_symbol(symbol, args.limit).await?,
        None => store.all_trades().await?,
    };

    if trades.is_empty() {
        println!("No closed trades found");
        return Ok(());
    }

    let mut symbols: Vec<&str> = trades.iter().map(|t| t.symbol.as_str()).collect();
    symbols.sort_unstable();
    symbols.dedup();

    println!("\n═══════════════════════════════════════════════════════");
    println!("                    TRADE REPORT");
    println!("═══════════════════════════════════════════════════════\n");

    for symbol in symbols {
        let mut for_symbol: Vec<TradeRecord> = trades
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect();
        // Newest first, then cap
        for_symbol.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for_symbol.truncate(args.limit);

        let summary = Summary::from_trades(&for_symbol);
        println!("{}", symbol);
        println!("  Trades:          {}", summary.trades);
        println!("  Win rate:        {:.1}%", summary.win_rate());
        println!("  Cumulative PnL:  {:+.2}%", summary.total_pnl_pct);
        println!("  Opposing exits:  {}", summary.opposing_exits);
        println!("  Gain exits:      {}", summary.gain_exits);

        if let Some(last) = for_symbol.first() {
            println!(
                "  Last trade:      {} {} {:.2} → {:.2} ({:+.2}%) at {}",
                last.side,
                last.exit_reason.as_str(),
                last.entry_price,
                last.exit_price,
                last.pnl_percent,
                last.timestamp
            );
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlebot::Side;
    use chrono::Utc;

    fn trade(pnl: f64, reason: ExitReason) -> TradeRecord {
        TradeRecord {
            symbol: "PF_ETHUSD".to_string(),
            side: Side::Long,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            pnl_percent: pnl,
            exit_reason: reason,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_summary() {
        let trades = vec![
            trade(0.5, ExitReason::GainThreshold),
            trade(-0.25, ExitReason::OpposingSignal),
            trade(0.75, ExitReason::GainThreshold),
            trade(0.0, ExitReason::OpposingSignal),
        ];

        let summary = Summary::from_trades(&trades);
        assert_eq!(summary.trades, 4);
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.win_rate(), 50.0);
        assert!((summary.total_pnl_pct - 1.0).abs() < 1e-9);
        assert_eq!(summary.gain_exits, 2);
        assert_eq!(summary.opposing_exits, 2);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(Summary::from_trades(&[]).win_rate(), 0.0);
    }
}
