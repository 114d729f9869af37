//! Data synchronization engine
//!
//! A session is one fixed [`SyncConfig`]. Starting a session seeds the
//! snapshot from the cache synchronously, then runs one periodic loop per
//! feed. Each tick spawns an independent refresh, so a slow provider never
//! delays the next tick. Stopping a session triggers its [`CancelSignal`],
//! which aborts in-flight requests, clears the timers, and keeps any late
//! result away from the snapshot.
//!
//! ```text
//! start(config) ── seed from cache ──► Running
//!                                       ├── price loop   ─┐
//!                                       ├── history loop ─┼─► chain ─► cache ─► snapshot
//!                                       └── fx loop      ─┘
//! stop() ── cancel ──► Terminating ── loops joined ──► Stopped
//! ```

use crate::{
    cache::{CacheKey, FeedCache, FileStorage},
    cancel::CancelSignal,
    config::SyncConfig,
    error::SetupError,
    feeds::{Feed, FeedCatalog, HttpFeedCatalog},
    metrics::{FeedMetrics, MetricsCollector},
    providers::ChainOutcome,
    types::{Coin, CoinQuote, ComponentHealth, FeedKind, HealthStatus, Snapshot},
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Lifecycle of a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Seeding the snapshot from the cache
    Initializing,
    /// Feed loops active
    Running,
    /// Cancellation requested, in-flight work unwinding
    Terminating,
    /// No session active
    Stopped,
}

/// Writes a feed value into the snapshot; the flag marks it as stale
type ApplyFn<T> = fn(&mut Snapshot, T, bool);

struct Session {
    id: Uuid,
    config: SyncConfig,
    cancel: CancelSignal,
    loops: Vec<JoinHandle<()>>,
}

/// Shared by every loop and refresh of a session
#[derive(Clone)]
struct FeedContext {
    session_id: Uuid,
    cache: FeedCache,
    snapshot: Arc<watch::Sender<Snapshot>>,
    metrics: Arc<MetricsCollector>,
    cancel: CancelSignal,
}

impl FeedContext {
    /// Applies `update` unless the session has been cancelled
    ///
    /// The check runs under the snapshot lock, so once `stop` has triggered
    /// the signal no refresh can publish any more.
    fn publish(&self, update: impl FnOnce(&mut Snapshot)) -> bool {
        let cancel = &self.cancel;
        self.snapshot.send_if_modified(|snapshot| {
            if cancel.is_cancelled() {
                return false;
            }
            update(snapshot);
            true
        })
    }
}

/// Keeps the price, history and exchange rate feeds synchronized
///
/// The snapshot outlives sessions: restarting with the same coin keeps the
/// values on screen, switching coins swaps in the new coin's cached values
/// right away.
///
/// # Example
/// ```no_run
/// use crypto_overlay_sdk::{SyncConfig, SyncEngine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut engine = SyncEngine::with_defaults()?;
/// let mut snapshots = engine.subscribe();
/// engine.start(SyncConfig::default());
///
/// snapshots.changed().await?;
/// println!("{:?}", snapshots.borrow().coin_price);
/// engine.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct SyncEngine {
    catalog: Arc<dyn FeedCatalog>,
    cache: FeedCache,
    snapshot: Arc<watch::Sender<Snapshot>>,
    state: watch::Sender<SessionState>,
    metrics: HashMap<FeedKind, Arc<MetricsCollector>>,
    session: Option<Session>,
    seeded: bool,
}

impl SyncEngine {
    /// Creates a stopped engine
    pub fn new(catalog: Arc<dyn FeedCatalog>, cache: FeedCache) -> Self {
        let (snapshot, _rx) = watch::channel(Snapshot::empty(Coin::default()));
        let (state, _rx) = watch::channel(SessionState::Stopped);
        let metrics = FeedKind::all()
            .iter()
            .map(|kind| (*kind, Arc::new(MetricsCollector::new(kind.name()))))
            .collect();

        Self {
            catalog,
            cache,
            snapshot: Arc::new(snapshot),
            state,
            metrics,
            session: None,
            seeded: false,
        }
    }

    /// Engine over the public HTTP feeds with the on-disk cache
    pub fn with_defaults() -> Result<Self, SetupError> {
        let catalog = HttpFeedCatalog::new()?;
        let storage = FileStorage::default_location()?;
        Ok(Self::new(
            Arc::new(catalog),
            FeedCache::new(Arc::new(storage)),
        ))
    }

    /// Starts a session for `config`
    ///
    /// The snapshot is seeded from the cache before this returns; no network
    /// call is awaited. A session that is still running is cancelled first
    /// without waiting for it to unwind; use [`restart`](Self::restart) to
    /// wait. Must be called from within a Tokio runtime.
    pub fn start(&mut self, config: SyncConfig) {
        if let Some(previous) = self.session.take() {
            previous.cancel.cancel();
            for handle in &previous.loops {
                handle.abort();
            }
        }

        self.state.send_replace(SessionState::Initializing);
        self.seed(config.coin);

        let session_id = Uuid::new_v4();
        let cancel = CancelSignal::new();
        let feeds = self.catalog.feeds(&config);

        let loops = vec![
            self.spawn_feed(session_id, &cancel, feeds.price, Snapshot::apply_quote),
            self.spawn_feed(session_id, &cancel, feeds.history, Snapshot::apply_history),
            self.spawn_feed(session_id, &cancel, feeds.fx, Snapshot::apply_fx),
        ];

        tracing::info!(
            session_id = %session_id,
            coin = %config.coin,
            price_interval_ms = config.price_interval_ms,
            history_interval_ms = config.history_interval_ms,
            fx_interval_ms = config.fx_interval_ms,
            "Sync session started"
        );

        self.session = Some(Session {
            id: session_id,
            config,
            cancel,
            loops,
        });
        self.state.send_replace(SessionState::Running);
    }

    /// Ends the current session and waits until all of its work has unwound
    ///
    /// Requests still in flight are dropped, never awaited.
    pub async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.state.send_replace(SessionState::Terminating);
        session.cancel.cancel();
        futures::future::join_all(session.loops).await;
        self.state.send_replace(SessionState::Stopped);

        tracing::info!(session_id = %session.id, "Sync session stopped");
    }

    /// Stops the current session, then starts one for `config`
    pub async fn restart(&mut self, config: SyncConfig) {
        self.stop().await;
        self.start(config);
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Configuration of the running session, if any
    pub fn config(&self) -> Option<SyncConfig> {
        self.session.as_ref().map(|s| s.config)
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    /// Refresh metrics of every feed, in price / history / fx order
    pub async fn feed_metrics(&self) -> Vec<FeedMetrics> {
        let mut result = Vec::with_capacity(FeedKind::all().len());
        for kind in FeedKind::all() {
            if let Some(collector) = self.metrics.get(kind) {
                result.push(collector.get_metrics().await);
            }
        }
        result
    }

    /// Health derived from the current snapshot
    ///
    /// A feed is healthy with fresh data, degraded when only cached data is
    /// shown and unhealthy with no data at all.
    pub fn health(&self) -> ComponentHealth {
        let snapshot = self.snapshot();
        let feeds = [
            (
                FeedKind::Price,
                feed_status(snapshot.coin_price.is_some(), snapshot.coin_stale),
            ),
            (
                FeedKind::History,
                feed_status(!snapshot.coin_history.is_empty(), snapshot.history_stale),
            ),
            (
                FeedKind::Fx,
                feed_status(snapshot.usd_rub.is_some(), snapshot.fx_stale),
            ),
        ];

        let mut details = HashMap::new();
        details.insert(
            "coin".to_string(),
            serde_json::json!(snapshot.coin_symbol),
        );
        details.insert(
            "session_state".to_string(),
            serde_json::json!(format!("{:?}", self.state())),
        );
        for (kind, status) in &feeds {
            details.insert(kind.name().to_string(), serde_json::json!(status));
        }

        let status = if feeds.iter().all(|(_, s)| *s == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if feeds.iter().all(|(_, s)| *s == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        let message = match status {
            HealthStatus::Healthy => "All feeds are fresh".to_string(),
            HealthStatus::Degraded => {
                let lagging: Vec<&str> = feeds
                    .iter()
                    .filter(|(_, s)| *s != HealthStatus::Healthy)
                    .map(|(kind, _)| kind.name())
                    .collect();
                format!("Feeds without fresh data: {}", lagging.join(", "))
            }
            HealthStatus::Unhealthy => "No feed has any data".to_string(),
        };

        ComponentHealth {
            name: "crypto_sync_engine".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }

    /// Seeds the snapshot for a session on `coin`
    ///
    /// First start reads every feed from the cache. A coin switch swaps the
    /// labels and the coin-scoped values, clearing values the new coin has no
    /// cache for. Same-coin restarts keep the snapshot.
    fn seed(&mut self, coin: Coin) {
        let cache = &self.cache;
        let first = !self.seeded;
        self.seeded = true;

        self.snapshot.send_if_modified(|snapshot| {
            if first {
                *snapshot = Snapshot::empty(coin);
                if let Some(rate) = cache.get::<f64>(&CacheKey::fx()) {
                    snapshot.apply_fx(rate, true);
                }
            } else if snapshot.is_for(coin) {
                return false;
            } else {
                snapshot.coin_symbol = coin.symbol().to_string();
                snapshot.coin_name = coin.display_name().to_string();
            }

            match cache.get::<CoinQuote>(&CacheKey::price(coin)) {
                Some(quote) => snapshot.apply_quote(quote, true),
                None => {
                    snapshot.coin_price = None;
                    snapshot.coin_change_24h = None;
                    snapshot.coin_stale = false;
                }
            }
            match cache.get::<Vec<f64>>(&CacheKey::history(coin)) {
                Some(history) => snapshot.apply_history(history, true),
                None => {
                    snapshot.coin_history.clear();
                    snapshot.history_stale = false;
                }
            }
            true
        });
    }

    fn spawn_feed<T>(
        &self,
        session_id: Uuid,
        cancel: &CancelSignal,
        feed: Feed<T>,
        apply: ApplyFn<T>,
    ) -> JoinHandle<()>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let metrics = self.metrics[&feed.kind].clone();
        let ctx = FeedContext {
            session_id,
            cache: self.cache.clone(),
            snapshot: self.snapshot.clone(),
            metrics,
            cancel: cancel.clone(),
        };
        tokio::spawn(run_feed_loop(Arc::new(feed), ctx, apply))
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            for handle in session.loops {
                handle.abort();
            }
        }
    }
}

fn feed_status(present: bool, stale: bool) -> HealthStatus {
    match (present, stale) {
        (false, _) => HealthStatus::Unhealthy,
        (true, true) => HealthStatus::Degraded,
        (true, false) => HealthStatus::Healthy,
    }
}

/// Ticks at `feed.interval` from session start until cancelled
async fn run_feed_loop<T>(feed: Arc<Feed<T>>, ctx: FeedContext, apply: ApplyFn<T>)
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // First tick completes immediately; a stalled loop resumes with one
    // tick instead of a burst of catch-up refreshes
    let mut ticker = tokio::time::interval(feed.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {
                in_flight.spawn(refresh(feed.clone(), ctx.clone(), apply));
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    in_flight.shutdown().await;
}

/// Runs the feed's chain once and folds the outcome into cache and snapshot
async fn refresh<T>(feed: Arc<Feed<T>>, ctx: FeedContext, apply: ApplyFn<T>)
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let started = Instant::now();

    match feed.chain.execute(&ctx.cancel).await {
        ChainOutcome::Cancelled => {}
        ChainOutcome::Fetched { value, provider } => {
            // A value the cancelled session never showed is not cached either
            if !ctx.publish(|snapshot| apply(snapshot, value.clone(), false)) {
                return;
            }
            ctx.cache.set_async(&feed.key, &value).await;
            ctx.metrics
                .record_refresh(started.elapsed(), Some(provider))
                .await;

            tracing::debug!(
                session_id = %ctx.session_id,
                feed = feed.kind.name(),
                provider,
                latency_ms = started.elapsed().as_millis() as u64,
                "Feed refreshed"
            );
        }
        ChainOutcome::Exhausted => {
            if ctx.cancel.is_cancelled() {
                return;
            }
            ctx.metrics.record_refresh(started.elapsed(), None).await;

            match ctx.cache.get_async::<T>(&feed.key).await {
                Some(cached) => {
                    if !ctx.publish(|snapshot| apply(snapshot, cached, true)) {
                        return;
                    }
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        feed = feed.kind.name(),
                        key = %feed.key,
                        "All providers failed, serving cached value"
                    );
                }
                None => {
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        feed = feed.kind.name(),
                        key = %feed.key,
                        "All providers failed and nothing is cached"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
