use crate::config::global::AppConfig;
use crate::core::guard::ReadOnlyGuard;
use crate::core::registry::AppRegistry;
use crate::models::error::SError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, warn};

#[derive(Clone, Debug)]
pub struct TaskTiming {
    pub reconcile: Duration,
    pub index_refresh: Duration,
    pub read_only_poll: Duration,
    pub edit_debounce: Duration,
}

impl TaskTiming {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            reconcile: Duration::from_secs(config.reconcile_interval_secs.max(1)),
            index_refresh: Duration::from_secs(config.index_refresh_secs.max(1)),
            read_only_poll: Duration::from_secs(config.read_only_poll_secs.max(1)),
            edit_debounce: Duration::from_millis(config.edit_debounce_ms.max(50)),
        }
    }
}

/// The periodic loops keeping the library in step with disk, remotes and the game.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Must be called from within a tokio runtime.
    pub fn spawn(registry: Arc<AppRegistry>, guard: ReadOnlyGuard, timing: TaskTiming) -> Self {
        let guard = Arc::new(Mutex::new(guard));
        let handles = vec![
            tokio::spawn(watch_game(guard, timing.read_only_poll)),
            tokio::spawn(every(timing.reconcile, registry.clone(), |r| {
                r.reconcile().map(drop)
            })),
            tokio::spawn(every(timing.index_refresh, registry.clone(), |r| {
                r.refresh_index_files().map(drop)
            })),
            tokio::spawn(debounce_edits(registry, timing.edit_debounce)),
        ];
        Self { handles }
    }

    /// Stops the loops between ticks. Work already handed to a blocking thread finishes.
    pub fn shutdown(self) {
        self.handles.iter().for_each(JoinHandle::abort);
    }
}

async fn run_blocking<F>(registry: Arc<AppRegistry>, job: F)
where
    F: FnOnce(&AppRegistry) -> Result<(), SError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || job(&registry)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("background pass failed: {e}"),
        Err(e) => error!("background pass panicked: {e}"),
    }
}

async fn every<F>(period: Duration, registry: Arc<AppRegistry>, job: F)
where
    F: Fn(&AppRegistry) -> Result<(), SError> + Send + Sync + Copy + 'static,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_blocking(registry.clone(), job).await;
    }
}

async fn watch_game(guard: Arc<Mutex<ReadOnlyGuard>>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let guard = guard.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || guard.lock().poll()).await {
            error!("game detection panicked: {e}");
        }
    }
}

async fn debounce_edits(registry: Arc<AppRegistry>, quiet: Duration) {
    let mut ticker = interval(quiet);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if registry.edits_settled(quiet) && !registry.is_read_only() {
            run_blocking(registry.clone(), |r| r.flush_edits().map(drop)).await;
        }
    }
}
