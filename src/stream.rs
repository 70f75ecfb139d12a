//! Recent activity streaming sessions.
//!
//! A [`StreamingSession`] belongs to one connected client. Each
//! [`tick`](StreamingSession::tick) computes a snapshot for the session's
//! current page and advances the cursor, sweeping all pages of current
//! activity over and over. [`run`](StreamingSession::run) drives ticks on
//! a timer and pushes events into a channel until the client goes away or
//! the server shuts down.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::errors::MonitorError;
use crate::models::ResolvedObject;
use crate::pagination::{PageRequest, Pagination};
use crate::snapshot::{RecentActivitySnapshotter, Snapshot, Statistics, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closed,
}

/// Page the next tick will fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCursor {
    current_page: u32,
}

impl Default for StreamCursor {
    fn default() -> Self {
        Self { current_page: 1 }
    }
}

impl StreamCursor {
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Move to the next page, or back to the first once the last one was shown
    pub fn advance(&mut self, pagination: &Pagination) {
        self.current_page = if pagination.has_next {
            self.current_page.saturating_add(1)
        } else {
            1
        };
    }
}

/// Per-session streaming parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub interval: Duration,
    pub page_size: u32,
    /// Accepted from clients but not used
    pub total_limit: Option<u64>,
}

impl StreamOptions {
    /// Options from loosely typed query parameters, the interval kept above the floor
    pub fn from_params(
        interval: Option<&str>,
        limit: Option<&str>,
        total_limit: Option<&str>,
        config: &StreamConfig,
    ) -> Self {
        let interval = interval
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(config.default_interval)
            .max(config.min_interval);
        let page = PageRequest::from_params(None, limit, config.default_page_size);

        Self {
            interval,
            page_size: page.page_size(),
            total_limit: total_limit.and_then(|v| v.trim().parse().ok()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Initial,
    Update,
    Error,
}

/// One line of the NDJSON stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ResolvedObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StreamEvent {
    pub fn snapshot(kind: EventKind, snapshot: Snapshot, now: DateTime<Utc>) -> Self {
        let statistics = Statistics::tally(&snapshot.items);
        let message = match &snapshot.pagination {
            Some(p) => format!(
                "Page {} of {}: {}",
                p.page,
                p.total_pages.max(1),
                statistics.summary
            ),
            None => statistics.summary.clone(),
        };

        Self {
            kind,
            count: Some(snapshot.items.len()),
            data: Some(snapshot.items),
            pagination: snapshot.pagination,
            statistics: Some(statistics),
            timestamp: now,
            time_range: Some(snapshot.time_range),
            message: Some(message),
        }
    }

    pub fn error(error: &MonitorError, now: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Error,
            data: None,
            pagination: None,
            statistics: None,
            count: None,
            timestamp: now,
            time_range: None,
            message: Some(error.to_string()),
        }
    }

    /// Serialize as one newline-terminated JSON line
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

pub struct StreamingSession {
    snapshotter: Arc<RecentActivitySnapshotter>,
    options: StreamOptions,
    cursor: StreamCursor,
    state: SessionState,
}

impl StreamingSession {
    pub fn new(snapshotter: Arc<RecentActivitySnapshotter>, options: StreamOptions) -> Self {
        Self {
            snapshotter,
            options,
            cursor: StreamCursor::default(),
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> StreamCursor {
        self.cursor
    }

    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("Streaming session closed");
        }
        self.state = SessionState::Closed;
    }

    /// Compute the event for the current page
    ///
    /// The first successful tick yields the initial event and starts streaming.
    /// A failed tick yields an error event and leaves the cursor in place.
    /// Returns `None` once the session is closed.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Option<StreamEvent> {
        let kind = match self.state {
            SessionState::Closed => return None,
            SessionState::Connecting => EventKind::Initial,
            SessionState::Streaming => EventKind::Update,
        };

        let page = PageRequest::new(
            self.cursor.current_page() as i64,
            self.options.page_size as i64,
        );
        match self.snapshotter.try_snapshot(page, now).await {
            Ok(snapshot) => {
                if let Some(pagination) = &snapshot.pagination {
                    self.cursor.advance(pagination);
                }
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Streaming;
                }
                Some(StreamEvent::snapshot(kind, snapshot, now))
            }
            Err(e) => {
                warn!("Streaming tick failed: {}", e);
                Some(StreamEvent::error(&e, now))
            }
        }
    }

    /// Drive ticks until the receiver is dropped or shutdown is signalled
    ///
    /// Ticks never overlap: a slow snapshot delays the next tick instead of
    /// piling up queries.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<StreamEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> SessionState {
        info!(
            "Streaming session started: interval={:?}, page_size={}",
            self.options.interval, self.options.page_size
        );

        let mut ticker = time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = tx.closed() => break,
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let event = tokio::select! {
                        _ = tx.closed() => None,
                        event = self.tick(Utc::now()) => event,
                    };
                    match event {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        self.close();
        info!("Streaming session ended");
        self.state
    }
}
