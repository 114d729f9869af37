use super::*;
use async_trait::async_trait;
use crate::cache::MemoryStorage;
use crate::error::ProviderError;
use crate::feeds::{valid_history, valid_quote, valid_rate, FeedSet};
use crate::provider::{mock::MockStrategy, FetchStrategy};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant as TokioInstant;

struct MockCatalog {
    price: Vec<Arc<MockStrategy<CoinQuote>>>,
    history: Vec<Arc<MockStrategy<Vec<f64>>>>,
    fx: Vec<Arc<MockStrategy<f64>>>,
    requested: Mutex<Vec<SyncConfig>>,
}

fn erase<T: Clone + Send + Sync + 'static>(
    mocks: &[Arc<MockStrategy<T>>],
) -> Vec<Arc<dyn FetchStrategy<T>>> {
    mocks
        .iter()
        .map(|m| m.clone() as Arc<dyn FetchStrategy<T>>)
        .collect()
}

impl FeedCatalog for MockCatalog {
    fn feeds(&self, config: &SyncConfig) -> FeedSet {
        self.requested.lock().unwrap().push(*config);
        FeedSet {
            price: Feed::new(
                FeedKind::Price,
                CacheKey::price(config.coin),
                config.price_interval(),
                erase(&self.price),
                valid_quote,
            ),
            history: Feed::new(
                FeedKind::History,
                CacheKey::history(config.coin),
                config.history_interval(),
                erase(&self.history),
                valid_history,
            ),
            fx: Feed::new(
                FeedKind::Fx,
                CacheKey::fx(),
                config.fx_interval(),
                erase(&self.fx),
                valid_rate,
            ),
        }
    }
}

fn series(len: usize) -> Vec<f64> {
    (0..len).map(|i| 66000.0 + i as f64 * 10.0).collect()
}

fn healthy_catalog() -> Arc<MockCatalog> {
    Arc::new(MockCatalog {
        price: vec![
            Arc::new(MockStrategy::ok("primary", CoinQuote::new(67000.0, Some(2.5)))),
            Arc::new(MockStrategy::ok("secondary", CoinQuote::new(1.0, None))),
        ],
        history: vec![
            Arc::new(MockStrategy::ok("primary", series(24))),
            Arc::new(MockStrategy::ok("secondary", series(5))),
        ],
        fx: vec![
            Arc::new(MockStrategy::ok("primary", 92.5)),
            Arc::new(MockStrategy::ok("secondary", 1.0)),
        ],
        requested: Mutex::new(Vec::new()),
    })
}

fn config(coin: Coin) -> SyncConfig {
    SyncConfig {
        coin,
        ..SyncConfig::default()
    }
}

/// Lets spawned loops and refreshes run to their next await point
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_all_providers_succeed_gives_fresh_snapshot() {
    let catalog = healthy_catalog();
    let cache = FeedCache::in_memory();
    let mut engine = SyncEngine::new(catalog.clone(), cache.clone());

    engine.start(config(Coin::BTC));
    settle().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_price, Some(67000.0));
    assert_eq!(snapshot.coin_change_24h, Some(2.5));
    assert_eq!(snapshot.coin_history, series(24));
    assert_eq!(snapshot.usd_rub, Some(92.5));
    assert!(!snapshot.coin_stale);
    assert!(!snapshot.history_stale);
    assert!(!snapshot.fx_stale);
    assert_eq!(snapshot.coin_symbol, "BTC");
    assert_eq!(snapshot.coin_name, "Bitcoin");

    // Lower-priority providers are never consulted when the first one works
    assert_eq!(catalog.price[1].call_count(), 0);
    assert_eq!(catalog.history[1].call_count(), 0);
    assert_eq!(catalog.fx[1].call_count(), 0);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_success_clears_stale_flag_and_writes_cache() {
    let catalog = healthy_catalog();
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::price(Coin::BTC), &CoinQuote::new(60000.0, None));
    cache.set(&CacheKey::fx(), &90.0_f64);
    let mut engine = SyncEngine::new(catalog, cache.clone());

    engine.start(config(Coin::BTC));
    let seeded = engine.snapshot();
    assert_eq!(seeded.coin_price, Some(60000.0));
    assert!(seeded.coin_stale);
    assert!(seeded.fx_stale);

    settle().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_price, Some(67000.0));
    assert!(!snapshot.coin_stale);
    assert!(!snapshot.fx_stale);
    assert_eq!(
        cache.get::<CoinQuote>(&CacheKey::price(Coin::BTC)),
        Some(CoinQuote::new(67000.0, Some(2.5)))
    );
    assert_eq!(cache.get::<Vec<f64>>(&CacheKey::history(Coin::BTC)), Some(series(24)));
    assert_eq!(cache.get::<f64>(&CacheKey::fx()), Some(92.5));

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_price_failure_falls_back_to_cached_quote() {
    let catalog = healthy_catalog();
    catalog.price[0].set_error();
    catalog.price[1].set_error();
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::price(Coin::BTC), &CoinQuote::new(65000.0, Some(1.2)));
    let mut engine = SyncEngine::new(catalog.clone(), cache);

    engine.start(config(Coin::BTC));
    settle().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_price, Some(65000.0));
    assert_eq!(snapshot.coin_change_24h, Some(1.2));
    assert!(snapshot.coin_stale);
    assert_eq!(catalog.price[1].call_count(), 1);

    let metrics = engine.feed_metrics().await;
    assert_eq!(metrics[0].feed, "price");
    assert_eq!(metrics[0].failed_refreshes, 1);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_without_cache_keeps_previous_values() {
    let catalog = healthy_catalog();
    // Every write is dropped, so nothing is ever cached
    let cache = FeedCache::new(Arc::new(MemoryStorage::with_quota(0)));
    let mut engine = SyncEngine::new(catalog.clone(), cache.clone());
    let base = TokioInstant::now();

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(engine.snapshot().coin_price, Some(67000.0));
    assert!(cache.get::<CoinQuote>(&CacheKey::price(Coin::BTC)).is_none());

    catalog.price[0].set_error();
    catalog.price[1].set_error();
    tokio::time::sleep_until(base + Duration::from_secs(31)).await;
    settle().await;

    assert_eq!(catalog.price[0].call_count(), 2);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_price, Some(67000.0));
    assert_eq!(snapshot.coin_change_24h, Some(2.5));
    assert!(!snapshot.coin_stale);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_short_history_falls_through_to_next_provider() {
    let catalog = healthy_catalog();
    catalog.history[0].set_value(vec![1.0, 2.0]);
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());

    engine.start(config(Coin::BTC));
    settle().await;

    assert_eq!(engine.snapshot().coin_history, series(5));
    assert_eq!(catalog.history[0].call_count(), 1);
    assert_eq!(catalog.history[1].call_count(), 1);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_short_history_everywhere_serves_cached_series() {
    let catalog = healthy_catalog();
    catalog.history[0].set_value(vec![1.0, 2.0]);
    catalog.history[1].set_value(vec![]);
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::history(Coin::BTC), &series(12));
    let mut engine = SyncEngine::new(catalog, cache);

    engine.start(config(Coin::BTC));
    settle().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_history, series(12));
    assert!(snapshot.history_stale);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_fx_failure_falls_back_to_cached_rate() {
    let catalog = healthy_catalog();
    for mock in &catalog.fx {
        mock.set_error();
    }
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::fx(), &91.25_f64);
    let mut engine = SyncEngine::new(catalog.clone(), cache);

    engine.start(config(Coin::BTC));
    settle().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.usd_rub, Some(91.25));
    assert!(snapshot.fx_stale);
    assert_eq!(snapshot.coin_price, Some(67000.0));
    assert!(!snapshot.coin_stale);
    assert_eq!(catalog.fx[0].call_count(), 1);
    assert_eq!(catalog.fx[1].call_count(), 1);

    let metrics = engine.feed_metrics().await;
    assert_eq!(metrics[2].feed, "fx");
    assert_eq!(metrics[2].failed_refreshes, 1);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_snapshot_comes_from_cache_before_any_fetch() {
    let catalog = healthy_catalog();
    for mock in &catalog.price {
        mock.set_delay(Duration::from_secs(60));
    }
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::price(Coin::BTC), &CoinQuote::new(64000.0, Some(-0.4)));
    cache.set(&CacheKey::history(Coin::BTC), &series(24));
    cache.set(&CacheKey::fx(), &91.0_f64);
    let mut engine = SyncEngine::new(catalog, cache);

    engine.start(config(Coin::BTC));

    // No await between start and the read
    let snapshot = engine.snapshot();
    assert_eq!(engine.state(), SessionState::Running);
    assert_eq!(snapshot.coin_price, Some(64000.0));
    assert_eq!(snapshot.coin_change_24h, Some(-0.4));
    assert_eq!(snapshot.coin_history, series(24));
    assert_eq!(snapshot.usd_rub, Some(91.0));
    assert!(snapshot.coin_stale && snapshot.history_stale && snapshot.fx_stale);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_coin_switch_shows_new_coin_cache_immediately() {
    let catalog = healthy_catalog();
    for mock in &catalog.price {
        mock.set_delay(Duration::from_secs(60));
    }
    for mock in &catalog.history {
        mock.set_delay(Duration::from_secs(60));
    }
    let cache = FeedCache::in_memory();
    cache.set(&CacheKey::price(Coin::ETH), &CoinQuote::new(3500.0, Some(0.7)));
    cache.set(&CacheKey::history(Coin::ETH), &vec![3400.0, 3450.0, 3500.0]);
    let mut engine = SyncEngine::new(catalog.clone(), cache);

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(engine.snapshot().usd_rub, Some(92.5));

    engine.restart(config(Coin::ETH)).await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_symbol, "ETH");
    assert_eq!(snapshot.coin_name, "Ethereum");
    assert_eq!(snapshot.coin_price, Some(3500.0));
    assert_eq!(snapshot.coin_change_24h, Some(0.7));
    assert_eq!(snapshot.coin_history, vec![3400.0, 3450.0, 3500.0]);
    assert!(snapshot.coin_stale);
    // The exchange rate is not coin scoped
    assert_eq!(snapshot.usd_rub, Some(92.5));

    // Nothing from the network has landed for the price feed yet
    let metrics = engine.feed_metrics().await;
    assert_eq!(metrics[0].total_refreshes, 0);
    assert_eq!(
        catalog.requested.lock().unwrap().last().map(|c| c.coin),
        Some(Coin::ETH)
    );

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_coin_switch_without_cache_clears_previous_coin_values() {
    let catalog = healthy_catalog();
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(engine.snapshot().coin_price, Some(67000.0));

    for mock in &catalog.price {
        mock.set_delay(Duration::from_secs(60));
    }
    for mock in &catalog.history {
        mock.set_delay(Duration::from_secs(60));
    }
    engine.restart(config(Coin::SOL)).await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.coin_symbol, "SOL");
    assert_eq!(snapshot.coin_price, None);
    assert_eq!(snapshot.coin_change_24h, None);
    assert!(snapshot.coin_history.is_empty());
    assert_eq!(snapshot.usd_rub, Some(92.5));

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_same_coin_restart_keeps_snapshot() {
    let catalog = healthy_catalog();
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());

    engine.start(config(Coin::BTC));
    settle().await;
    let before = engine.snapshot();

    for mock in &catalog.price {
        mock.set_delay(Duration::from_secs(60));
    }
    engine
        .restart(SyncConfig {
            price_interval_ms: 60_000,
            ..config(Coin::BTC)
        })
        .await;

    assert_eq!(engine.snapshot(), before);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_governs_subsequent_ticks() {
    let catalog = healthy_catalog();
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());
    let base = TokioInstant::now();

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 1);

    tokio::time::sleep_until(base + Duration::from_secs(31)).await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 2);

    let restarted = TokioInstant::now();
    engine
        .restart(SyncConfig {
            price_interval_ms: 60_000,
            ..config(Coin::BTC)
        })
        .await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 3);

    // The old cadence would have ticked at base + 60s
    tokio::time::sleep_until(restarted + Duration::from_secs(45)).await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 3);

    tokio::time::sleep_until(restarted + Duration::from_secs(61)).await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 4);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_does_not_delay_next_tick() {
    let catalog = healthy_catalog();
    catalog.price[0].set_delay(Duration::from_secs(45));
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());
    let base = TokioInstant::now();

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 1);

    tokio::time::sleep_until(base + Duration::from_secs(31)).await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 2);
    assert_eq!(engine.snapshot().coin_price, None);

    tokio::time::sleep_until(base + Duration::from_secs(46)).await;
    settle().await;
    assert_eq!(engine.snapshot().coin_price, Some(67000.0));

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_loop_resumes_without_tick_burst() {
    let catalog = healthy_catalog();
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());

    engine.start(SyncConfig {
        price_interval_ms: 1_000,
        ..config(Coin::BTC)
    });
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 1);

    // Jump past five deadlines at once
    tokio::time::advance(Duration::from_millis(5_500)).await;
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 2);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_teardown_discards_in_flight_results() {
    let catalog = healthy_catalog();
    catalog.price[0].set_delay(Duration::from_secs(10));
    let cache = FeedCache::in_memory();
    let mut engine = SyncEngine::new(catalog.clone(), cache.clone());
    let mut states = engine.subscribe_state();

    engine.start(config(Coin::BTC));
    settle().await;
    assert_eq!(catalog.price[0].call_count(), 1);

    let stopping = TokioInstant::now();
    engine.stop().await;
    assert!(stopping.elapsed() < Duration::from_secs(1));
    assert_eq!(engine.state(), SessionState::Stopped);
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Stopped);
    assert!(engine.config().is_none());

    tokio::time::sleep(Duration::from_secs(20)).await;
    settle().await;

    assert_eq!(engine.snapshot().coin_price, None);
    assert!(cache.get::<CoinQuote>(&CacheKey::price(Coin::BTC)).is_none());
    assert_eq!(catalog.price[0].call_count(), 1);
    assert_eq!(catalog.price[1].call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_timers() {
    let catalog = healthy_catalog();
    let mut engine = SyncEngine::new(catalog.clone(), FeedCache::in_memory());

    engine.start(config(Coin::BTC));
    settle().await;
    engine.stop().await;

    tokio::time::sleep(Duration::from_secs(600)).await;
    settle().await;

    assert_eq!(catalog.price[0].call_count(), 1);
    assert_eq!(catalog.history[0].call_count(), 1);
    assert_eq!(catalog.fx[0].call_count(), 1);
}

#[tokio::test]
async fn test_publish_after_cancel_is_discarded() {
    let (snapshot, _rx) = watch::channel(Snapshot::empty(Coin::BTC));
    let ctx = FeedContext {
        session_id: Uuid::new_v4(),
        cache: FeedCache::in_memory(),
        snapshot: Arc::new(snapshot),
        metrics: Arc::new(MetricsCollector::new("price")),
        cancel: CancelSignal::new(),
    };

    assert!(ctx.publish(|s| s.apply_fx(92.0, false)));
    ctx.cancel.cancel();
    assert!(!ctx.publish(|s| s.apply_fx(1.0, false)));

    assert_eq!(ctx.snapshot.borrow().usd_rub, Some(92.0));
}

/// Returns its value after triggering the session signal mid-fetch
struct CancelDuringFetch {
    cancel: CancelSignal,
    value: f64,
}

#[async_trait]
impl FetchStrategy<f64> for CancelDuringFetch {
    async fn fetch(&self) -> Result<f64, ProviderError> {
        self.cancel.cancel();
        Ok(self.value)
    }

    fn provider_name(&self) -> &'static str {
        "cancel_during_fetch"
    }
}

#[tokio::test]
async fn test_result_landing_after_cancel_is_neither_shown_nor_cached() {
    let (snapshot, _rx) = watch::channel(Snapshot::empty(Coin::BTC));
    let cancel = CancelSignal::new();
    let cache = FeedCache::in_memory();
    let ctx = FeedContext {
        session_id: Uuid::new_v4(),
        cache: cache.clone(),
        snapshot: Arc::new(snapshot),
        metrics: Arc::new(MetricsCollector::new("fx")),
        cancel: cancel.clone(),
    };
    let feed = Feed::new(
        FeedKind::Fx,
        CacheKey::fx(),
        Duration::from_secs(300),
        vec![Arc::new(CancelDuringFetch { cancel, value: 92.0 }) as Arc<dyn FetchStrategy<f64>>],
        valid_rate,
    );

    refresh(Arc::new(feed), ctx.clone(), Snapshot::apply_fx).await;

    assert!(ctx.cancel.is_cancelled());
    assert_eq!(ctx.snapshot.borrow().usd_rub, None);
    assert!(cache.get::<f64>(&CacheKey::fx()).is_none());
    assert_eq!(ctx.metrics.get_metrics().await.total_refreshes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_health_reflects_freshness() {
    let catalog = healthy_catalog();
    for mock in &catalog.fx {
        mock.set_error();
    }
    let cache = FeedCache::in_memory();
    let mut engine = SyncEngine::new(catalog, cache.clone());
    assert_eq!(engine.health().status, HealthStatus::Unhealthy);

    engine.start(config(Coin::BTC));
    settle().await;
    let health = engine.health();
    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.details["fx"], serde_json::json!(HealthStatus::Unhealthy));
    assert_eq!(health.details["price"], serde_json::json!(HealthStatus::Healthy));

    engine.stop().await;
}
