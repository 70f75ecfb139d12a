//! Polygon and time window queries over stored positions.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::errors::MonitorError;
use crate::geometry::Polygon;
use crate::models::{Mmsi, PositionReport, ResolvedObject};
use crate::pagination::{PageRequest, PageResult};
use crate::resolver::StaticAttributeResolver;
use crate::store::{AttributeMap, PositionStore, SpatialFilter};

/// Spatial query parameters exactly as received
#[derive(Debug, Clone, Default)]
pub struct SpatialQuery<'a> {
    pub polygon: Option<&'a str>,
    pub start_date: Option<&'a str>,
    pub end_date: Option<&'a str>,
}

impl SpatialQuery<'_> {
    /// Validate into a store filter, before the store is touched
    pub fn validate(&self) -> Result<SpatialFilter, MonitorError> {
        let present = |value: Option<&str>| value.filter(|v| !v.trim().is_empty()).is_some();
        let missing: Vec<&'static str> = [
            ("polygon", self.polygon),
            ("startDate", self.start_date),
            ("endDate", self.end_date),
        ]
        .into_iter()
        .filter(|(_, value)| !present(*value))
        .map(|(name, _)| name)
        .collect();

        let (Some(polygon), Some(start), Some(end), true) =
            (self.polygon, self.start_date, self.end_date, missing.is_empty())
        else {
            return Err(MonitorError::MissingParameter(missing));
        };

        let polygon = Polygon::parse(polygon)?;
        let start = parse_instant(start)?;
        let end = parse_instant(end)?;
        if start > end {
            return Err(MonitorError::InvalidTimeRange(format!(
                "startDate {} is after endDate {}",
                start, end
            )));
        }

        Ok(SpatialFilter {
            polygon,
            start,
            end,
        })
    }
}

/// Parse an instant from RFC 3339, a naive date-time (UTC) or a plain date (UTC midnight)
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, MonitorError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(MonitorError::InvalidTimeRange(format!(
        "invalid date format: {}",
        value
    )))
}

/// Executes spatial queries and joins static attributes onto the results
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn PositionStore>,
    resolver: StaticAttributeResolver,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn PositionStore>, resolver: StaticAttributeResolver) -> Self {
        Self { store, resolver }
    }

    /// Positional reports inside the polygon and time window, most recent first
    pub async fn spatial_query(
        &self,
        query: &SpatialQuery<'_>,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<PageResult<ResolvedObject>, MonitorError> {
        let filter = query.validate()?;
        debug!(
            "Spatial query: {} vertices, {} - {}, page {} size {}",
            filter.polygon.ring().len(),
            filter.start,
            filter.end,
            page.page(),
            page.page_size()
        );

        let result = self.store.find_within(&filter, page).await?;
        let primary = self.store.primary_attributes(&distinct_mmsis(&result.rows)).await?;
        let secondary = AttributeMap::new();

        let items = result
            .rows
            .into_iter()
            .map(|report| {
                let attributes = self.resolver.resolve_from(report.mmsi, &primary, &secondary);
                ResolvedObject::new(report, attributes, now)
            })
            .collect();

        Ok(PageResult::new(items, page, result.total))
    }

    /// Raw stored reports, no filtering or enrichment
    pub async fn list_positions(
        &self,
        page: PageRequest,
    ) -> Result<PageResult<PositionReport>, MonitorError> {
        let result = self.store.list_positions(page).await?;
        Ok(PageResult::new(result.rows, page, result.total))
    }
}

pub(crate) fn distinct_mmsis(rows: &[PositionReport]) -> Vec<Mmsi> {
    let mut mmsis: Vec<Mmsi> = rows.iter().map(|r| r.mmsi).collect();
    mmsis.sort_unstable();
    mmsis.dedup();
    mmsis
}
