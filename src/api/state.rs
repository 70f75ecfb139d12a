//! Shared state handed to every request handler.

use std::sync::Arc;

use chrono::TimeDelta;
use tokio::sync::watch;

use crate::config::StreamConfig;
use crate::errors::MonitorError;
use crate::query::QueryEngine;
use crate::resolver::{FallbackRegistry, StaticAttributeResolver};
use crate::snapshot::RecentActivitySnapshotter;
use crate::store::PositionStore;

pub struct AppState {
    pub engine: QueryEngine,
    pub snapshotter: Arc<RecentActivitySnapshotter>,
    pub stream: StreamConfig,
    /// Flips to `true` when the server is shutting down; open streams end on it
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PositionStore>,
        fallback: Arc<FallbackRegistry>,
        stream: StreamConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, MonitorError> {
        let window =
            TimeDelta::from_std(stream.window).map_err(|e| MonitorError::ConfigurationError {
                message: format!("Invalid recent activity window: {}", e),
            })?;
        let resolver = StaticAttributeResolver::new(fallback);
        let snapshotter =
            RecentActivitySnapshotter::new(store.clone(), resolver.clone()).with_window(window);

        Ok(Self {
            engine: QueryEngine::new(store, resolver),
            snapshotter: Arc::new(snapshotter),
            stream,
            shutdown,
        })
    }
}
