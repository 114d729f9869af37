use crypto_overlay_sdk::display::{fmt_change, fmt_price, fmt_rate, ChangeDirection};
use crypto_overlay_sdk::{Coin, ConfigSource, SettingsUpdate, SyncConfig, SyncDriver, SyncEngine};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("Crypto Overlay Watch");
    println!("====================");

    // Optional first argument picks the coin, e.g. `ETH`
    let coin = std::env::args()
        .nth(1)
        .and_then(|arg| Coin::all().iter().copied().find(|c| c.symbol() == arg.to_uppercase()))
        .unwrap_or_default();

    let engine = SyncEngine::with_defaults()?;
    let mut snapshots = engine.subscribe();
    let source = ConfigSource::new(SyncConfig::default());
    source.update(SettingsUpdate {
        coin: Some(coin),
        price_interval_ms: Some(15_000),
        ..SettingsUpdate::default()
    });

    let driver = tokio::spawn(SyncDriver::new(engine, source.subscribe()).run());

    let watch = async {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let change = fmt_change(snapshot.coin_change_24h).unwrap_or_default();
            let direction = match ChangeDirection::of(snapshot.coin_change_24h) {
                ChangeDirection::Up => "▲",
                ChangeDirection::Down => "▼",
                ChangeDirection::Flat => "•",
            };

            println!("\n{:-<50}", "");
            println!(
                "{:<6} {:>12} {} {:<8}{}",
                snapshot.coin_symbol,
                fmt_price(snapshot.coin_price),
                direction,
                change,
                if snapshot.coin_stale { " (stale)" } else { "" }
            );
            println!(
                "History: {} points{}",
                snapshot.coin_history.len(),
                if snapshot.history_stale { " (stale)" } else { "" }
            );
            println!(
                "USD/RUB {:>10}{}",
                fmt_rate(snapshot.usd_rub),
                if snapshot.fx_stale { " (stale)" } else { "" }
            );
        }
    };

    tokio::select! {
        _ = watch => {}
        _ = tokio::signal::ctrl_c() => {}
        _ = tokio::time::sleep(Duration::from_secs(120)) => {}
    }

    drop(source);
    let engine = driver.await?;
    for metrics in engine.feed_metrics().await {
        println!(
            "{:<8} p50 {:>7.1} ms  success {:>5.1}%  last provider {}",
            metrics.feed,
            metrics.latency_p50_ms,
            metrics.success_rate * 100.0,
            metrics.last_provider.unwrap_or("-")
        );
    }

    Ok(())
}
