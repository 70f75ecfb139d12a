//! Position store interface.
//!
//! The monitor only ever reads: positions are written by a separate
//! ingestion process. [`PositionStore`] lists the query capabilities the
//! monitor relies on; [`crate::database::Database`] implements them on
//! PostgreSQL/PostGIS and [`MemoryStore`] in memory.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::errors::MonitorError;
use crate::geometry::Polygon;
use crate::models::{AttributeRecord, Mmsi, PositionReport};
use crate::pagination::PageRequest;

/// Message types carrying static or voyage data only, never positions
pub const EXCLUDED_MESSAGE_TYPES: [u16; 2] = [5, 24];

pub fn is_positional(message_type: u16) -> bool {
    !EXCLUDED_MESSAGE_TYPES.contains(&message_type)
}

/// Polygon and inclusive time window filter
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    pub polygon: Polygon,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SpatialFilter {
    pub fn matches(&self, report: &PositionReport) -> bool {
        is_positional(report.message_type)
            && report.timestamp >= self.start
            && report.timestamp <= self.end
            && self.polygon.contains(&report.location)
    }
}

/// One page of rows plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    pub rows: Vec<PositionReport>,
    pub total: u64,
}

/// Static attributes of one source, keyed by MMSI
pub type AttributeMap = HashMap<Mmsi, AttributeRecord>;

#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Positional reports inside a polygon and time window, most recent first
    async fn find_within(
        &self,
        filter: &SpatialFilter,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError>;

    /// All stored reports, unfiltered; the total may be an estimate
    async fn list_positions(&self, page: PageRequest) -> Result<RowSet, MonitorError>;

    /// Most recent positional report of each vessel within `[since, until]`
    ///
    /// Rows come in MMSI order. Timestamp ties go to the highest sequence.
    async fn latest_per_vessel(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError>;

    /// Records of the authoritative static attribute source
    async fn primary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError>;

    /// Records of the secondary static attribute source
    async fn secondary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError>;
}

/// In-memory position store
#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: RwLock<Vec<PositionReport>>,
    primary: RwLock<AttributeMap>,
    secondary: RwLock<AttributeMap>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a report, assigning the next sequence number if it has none
    pub async fn insert_position(&self, mut report: PositionReport) {
        let mut positions = self.positions.write().await;
        if report.sequence == 0 {
            report.sequence = positions.len() as i64 + 1;
        }
        positions.push(report);
    }

    pub async fn insert_primary(&self, mmsi: Mmsi, record: AttributeRecord) {
        self.primary.write().await.insert(mmsi, record);
    }

    pub async fn insert_secondary(&self, mmsi: Mmsi, record: AttributeRecord) {
        self.secondary.write().await.insert(mmsi, record);
    }

    /// Make every query fail, as if the backend went away
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MonitorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MonitorError::StoreUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn lookup(
        &self,
        source: &RwLock<AttributeMap>,
        mmsis: &[Mmsi],
    ) -> Result<AttributeMap, MonitorError> {
        self.check_available()?;
        let source = source.read().await;
        Ok(mmsis
            .iter()
            .filter_map(|mmsi| source.get(mmsi).map(|record| (*mmsi, record.clone())))
            .collect())
    }
}

fn paginate(rows: Vec<PositionReport>, page: PageRequest) -> RowSet {
    let total = rows.len() as u64;
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    RowSet { rows, total }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn find_within(
        &self,
        filter: &SpatialFilter,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError> {
        self.check_available()?;
        let mut rows: Vec<PositionReport> = self
            .positions
            .read()
            .await
            .iter()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.sequence.cmp(&a.sequence))
        });
        Ok(paginate(rows, page))
    }

    async fn list_positions(&self, page: PageRequest) -> Result<RowSet, MonitorError> {
        self.check_available()?;
        let rows = self.positions.read().await.clone();
        Ok(paginate(rows, page))
    }

    async fn latest_per_vessel(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<RowSet, MonitorError> {
        self.check_available()?;
        let positions = self.positions.read().await;
        let mut latest: BTreeMap<Mmsi, &PositionReport> = BTreeMap::new();
        for report in positions.iter().filter(|r| {
            is_positional(r.message_type) && r.timestamp >= since && r.timestamp <= until
        }) {
            latest
                .entry(report.mmsi)
                .and_modify(|current| {
                    if (report.timestamp, report.sequence) > (current.timestamp, current.sequence)
                    {
                        *current = report;
                    }
                })
                .or_insert(report);
        }
        let rows = latest.into_values().cloned().collect();
        Ok(paginate(rows, page))
    }

    async fn primary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError> {
        self.lookup(&self.primary, mmsis).await
    }

    async fn secondary_attributes(&self, mmsis: &[Mmsi]) -> Result<AttributeMap, MonitorError> {
        self.lookup(&self.secondary, mmsis).await
    }
}
