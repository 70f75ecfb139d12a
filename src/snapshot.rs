//! Recent activity snapshots: the latest report of every vessel heard
//! within a trailing window.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::ObjectType;
use crate::errors::MonitorError;
use crate::models::ResolvedObject;
use crate::pagination::{PageRequest, Pagination};
use crate::query::distinct_mmsis;
use crate::resolver::StaticAttributeResolver;
use crate::store::PositionStore;

/// Length of the trailing window in minutes, unless configured otherwise
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "data")]
    pub items: Vec<ResolvedObject>,
    /// `None` when the snapshot could not be computed
    pub pagination: Option<Pagination>,
    pub time_range: TimeRange,
}

impl Snapshot {
    /// Empty snapshot standing for "temporarily unavailable"
    pub fn unavailable(time_range: TimeRange) -> Self {
        Self {
            items: Vec::new(),
            pagination: None,
            time_range,
        }
    }
}

/// Object and message type counts of a batch of items
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub object_types: BTreeMap<ObjectType, usize>,
    pub message_types: BTreeMap<u16, usize>,
    pub summary: String,
}

impl Statistics {
    pub fn tally(items: &[ResolvedObject]) -> Self {
        let mut object_types = BTreeMap::new();
        let mut message_types = BTreeMap::new();
        for item in items {
            *object_types
                .entry(item.object_classification.object_type)
                .or_insert(0) += 1;
            *message_types.entry(item.report.message_type).or_insert(0) += 1;
        }

        let breakdown = object_types
            .iter()
            .map(|(object_type, count)| format!("{} {}", count, object_type))
            .collect::<Vec<_>>()
            .join(", ");
        let summary = if breakdown.is_empty() {
            "0 objects".to_string()
        } else {
            format!("{} objects: {}", items.len(), breakdown)
        };

        Self {
            object_types,
            message_types,
            summary,
        }
    }
}

pub struct RecentActivitySnapshotter {
    store: Arc<dyn PositionStore>,
    resolver: StaticAttributeResolver,
    window: TimeDelta,
}

impl RecentActivitySnapshotter {
    pub fn new(store: Arc<dyn PositionStore>, resolver: StaticAttributeResolver) -> Self {
        Self {
            store,
            resolver,
            window: TimeDelta::minutes(DEFAULT_WINDOW_MINUTES),
        }
    }

    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    pub fn time_range(&self, now: DateTime<Utc>) -> TimeRange {
        TimeRange {
            start: now - self.window,
            end: now,
        }
    }

    /// Snapshot of one page, degraded to an empty unavailable snapshot on failure
    ///
    /// For one-shot callers. Streaming sessions use [`try_snapshot`](Self::try_snapshot)
    /// so a failed tick can be reported to the client.
    pub async fn snapshot(&self, page: PageRequest, now: DateTime<Utc>) -> Snapshot {
        match self.try_snapshot(page, now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Recent activity snapshot failed: {}", e);
                Snapshot::unavailable(self.time_range(now))
            }
        }
    }

    /// Snapshot of one page, failures propagated
    pub async fn try_snapshot(
        &self,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, MonitorError> {
        let time_range = self.time_range(now);
        let latest = self
            .store
            .latest_per_vessel(time_range.start, time_range.end, page)
            .await?;

        let mmsis = distinct_mmsis(&latest.rows);
        let primary = self.store.primary_attributes(&mmsis).await?;
        let secondary = self.store.secondary_attributes(&mmsis).await?;

        let items: Vec<ResolvedObject> = latest
            .rows
            .into_iter()
            .map(|report| {
                let attributes = self.resolver.resolve_from(report.mmsi, &primary, &secondary);
                ResolvedObject::new(report, attributes, now)
            })
            .collect();

        debug!(
            "Recent activity page {}: {} of {} vessels",
            page.page(),
            items.len(),
            latest.total
        );

        Ok(Snapshot {
            items,
            pagination: Some(Pagination::new(page, latest.total)),
            time_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeRecord, Location, Mmsi, PositionReport, SENTINEL};
    use crate::resolver::FallbackRegistry;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn report(mmsi: u32, minutes_ago: i64, message_type: u16) -> PositionReport {
        PositionReport {
            sequence: 0,
            mmsi: Mmsi::try_from(mmsi).unwrap(),
            timestamp: now() - TimeDelta::minutes(minutes_ago),
            location: Location::new(24.9, 60.1),
            speed_over_ground: Some(8.0),
            course_over_ground: None,
            heading: None,
            rate_of_turn: None,
            navigation_status: Some(5),
            message_type,
            ais_type: None,
        }
    }

    fn snapshotter(store: Arc<MemoryStore>) -> RecentActivitySnapshotter {
        RecentActivitySnapshotter::new(store, StaticAttributeResolver::default())
    }

    #[tokio::test]
    async fn keeps_latest_report_per_vessel() {
        let store = Arc::new(MemoryStore::new());
        store.insert_position(report(230000001, 10, 1)).await;
        store.insert_position(report(230000001, 2, 1)).await;
        store.insert_position(report(230000002, 20, 1)).await; // outside window
        store.insert_position(report(230000003, 1, 5)).await; // static data

        let snapshot = snapshotter(store).try_snapshot(PageRequest::first(50), now()).await.unwrap();

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].report.timestamp, now() - TimeDelta::minutes(2));
        assert_eq!(snapshot.items[0].data_age_minutes, 2);
        assert_eq!(snapshot.pagination.unwrap().total, 1);
        assert_eq!(snapshot.time_range.start, now() - TimeDelta::minutes(15));
    }

    #[tokio::test]
    async fn resolves_through_all_sources() {
        let store = Arc::new(MemoryStore::new());
        store.insert_position(report(230000001, 1, 1)).await;
        store.insert_position(report(230000002, 1, 18)).await;
        store.insert_position(report(230000003, 1, 21)).await;
        store
            .insert_secondary(
                Mmsi::try_from(230000002u32).unwrap(),
                AttributeRecord {
                    name: Some("SECONDARY".to_string()),
                    ..Default::default()
                },
            )
            .await;

        let mut fallback = HashMap::new();
        fallback.insert(
            "230000003".to_string(),
            AttributeRecord {
                name: Some("FALLBACK BUOY".to_string()),
                ..Default::default()
            },
        );
        let resolver = StaticAttributeResolver::new(Arc::new(FallbackRegistry::new(fallback)));
        let snapshotter = RecentActivitySnapshotter::new(store, resolver);

        let snapshot = snapshotter.try_snapshot(PageRequest::first(50), now()).await.unwrap();
        let names: Vec<&str> = snapshot
            .items
            .iter()
            .map(|item| item.static_attributes.name.as_str())
            .collect();

        assert_eq!(names, vec![SENTINEL, "SECONDARY", "FALLBACK BUOY"]);
        assert_eq!(
            snapshot.items[2].object_classification.object_type,
            ObjectType::Buoy
        );
    }

    #[tokio::test]
    async fn paginates_vessels() {
        let store = Arc::new(MemoryStore::new());
        for mmsi in 230000001..=230000005 {
            store.insert_position(report(mmsi, 3, 1)).await;
        }
        let snapshotter = snapshotter(store);

        let snapshot = snapshotter.snapshot(PageRequest::new(3, 2), now()).await;
        let pagination = snapshot.pagination.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(pagination.total_pages, 3);
        assert!(!pagination.has_next);
    }

    #[tokio::test]
    async fn failure_degrades_to_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.insert_position(report(230000001, 1, 1)).await;
        store.set_available(false);

        let snapshot = snapshotter(store).snapshot(PageRequest::first(10), now()).await;
        assert!(snapshot.items.is_empty());
        assert!(snapshot.pagination.is_none());
    }

    #[tokio::test]
    async fn custom_window() {
        let store = Arc::new(MemoryStore::new());
        store.insert_position(report(230000001, 20, 1)).await;
        let snapshotter = snapshotter(store).with_window(TimeDelta::minutes(30));

        let snapshot = snapshotter.snapshot(PageRequest::first(10), now()).await;
        assert_eq!(snapshot.items.len(), 1);
    }

    #[tokio::test]
    async fn tally_counts_types() {
        let store = Arc::new(MemoryStore::new());
        store.insert_position(report(230000001, 1, 1)).await;
        store.insert_position(report(230000002, 1, 3)).await;
        store.insert_position(report(230000003, 1, 21)).await;
        store.insert_position(report(230000004, 1, 27)).await;

        let snapshot = snapshotter(store).snapshot(PageRequest::first(10), now()).await;
        let statistics = Statistics::tally(&snapshot.items);

        assert_eq!(statistics.object_types[&ObjectType::Vessel], 2);
        assert_eq!(statistics.object_types[&ObjectType::Buoy], 1);
        assert_eq!(statistics.object_types[&ObjectType::Unknown], 1);
        assert_eq!(statistics.message_types[&21], 1);
        assert_eq!(statistics.summary, "4 objects: 2 VESSEL, 1 BUOY, 1 UNKNOWN");

        let json = serde_json::to_value(&statistics).unwrap();
        assert_eq!(json["objectTypes"]["VESSEL"], 2);
        assert_eq!(json["messageTypes"]["1"], 1);
    }

    #[test]
    fn tally_of_nothing() {
        let statistics = Statistics::tally(&[]);
        assert!(statistics.object_types.is_empty());
        assert_eq!(statistics.summary, "0 objects");
    }
}
