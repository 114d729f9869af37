//! Binds a [`SyncEngine`] to a configuration channel

use crate::{config::SyncConfig, engine::SyncEngine};
use tokio::sync::watch;

/// Restarts the engine whenever the configuration changes
///
/// Subscribe to the engine's snapshot before handing it over. The driver
/// returns the stopped engine once every configuration sender is gone.
pub struct SyncDriver {
    engine: SyncEngine,
    config: watch::Receiver<SyncConfig>,
}

impl SyncDriver {
    pub fn new(engine: SyncEngine, config: watch::Receiver<SyncConfig>) -> Self {
        Self { engine, config }
    }

    pub async fn run(mut self) -> SyncEngine {
        let initial = *self.config.borrow_and_update();
        self.engine.start(initial);

        while self.config.changed().await.is_ok() {
            let next = *self.config.borrow_and_update();
            tracing::debug!(coin = %next.coin, "Configuration changed, restarting sync session");
            self.engine.restart(next).await;
        }

        self.engine.stop().await;
        self.engine
    }
}
