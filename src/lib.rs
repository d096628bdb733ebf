//! Keeps a folder of Astroneer `.pak` mods, their versions and load order in step with disk,
//! remote index files and the mod lists of dedicated servers.

pub mod config;
pub mod core;
pub mod models;
pub mod utils;

use crate::config::global::AppConfig;
use crate::core::guard::{ProcessDetector, ReadOnlyGuard};
use crate::core::registry::AppRegistry;
use crate::core::tasks::{BackgroundTasks, TaskTiming};
use crate::models::error::SError;
use std::sync::Arc;
use tracing::info;

/// Opens the store, runs a first reconciliation and starts the background loops.
/// Must be called from within a tokio runtime.
pub async fn start(config: &AppConfig) -> Result<(Arc<AppRegistry>, BackgroundTasks), SError> {
    let registry = Arc::new(AppRegistry::open(config)?);

    let mut guard = ReadOnlyGuard::new(
        registry.read_only_flag(),
        Box::new(ProcessDetector::new(config.game_binaries.clone())),
    );
    guard.poll();

    let first = registry.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<_, SError> {
        let report = first.reconcile()?;
        first.refresh_index_files()?;
        Ok(report)
    })
    .await
    .map_err(|e| SError::IOError(e.to_string()))??;
    info!(
        mods = registry.mods().len(),
        skipped = report.skipped.len(),
        "library ready"
    );

    let tasks = BackgroundTasks::spawn(registry.clone(), guard, TaskTiming::from_config(config));
    Ok((registry, tasks))
}
