// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::errors::MonitorError;
use crate::models::{AttributeRecord, Location, Mmsi, PositionReport};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PositionRow {
    pub(super) id: i64,
    pub(super) mmsi: i32,
    pub(super) created_at: DateTime<Utc>,
    pub(super) lon: f64,
    pub(super) lat: f64,
    pub(super) sog: Option<f64>,
    pub(super) cog: Option<f64>,
    pub(super) heading: Option<i16>,
    pub(super) rot: Option<f64>,
    pub(super) nav_status: Option<i16>,
    pub(super) message_type: i16,
    pub(super) ais_type: Option<String>,
}

impl TryFrom<PositionRow> for PositionReport {
    type Error = MonitorError;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(PositionReport {
            sequence: row.id,
            mmsi: Mmsi::try_from(row.mmsi)?,
            timestamp: row.created_at,
            location: Location::new(row.lon, row.lat),
            speed_over_ground: row.sog,
            course_over_ground: row.cog,
            heading: row.heading.and_then(|h| u16::try_from(h).ok()),
            rate_of_turn: row.rot,
            navigation_status: row.nav_status.and_then(|s| u8::try_from(s).ok()),
            // Negative codes are garbage; 0 classifies as unknown
            message_type: u16::try_from(row.message_type).unwrap_or(0),
            ais_type: row.ais_type,
        })
    }
}

/// Static attributes row, numeric columns cast to text by the query
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttributeRow {
    mmsi: i32,
    imo: Option<String>,
    name: Option<String>,
    built: Option<String>,
    flag: Option<String>,
    flag_name: Option<String>,
    vessel_type: Option<String>,
    type_name: Option<String>,
    gross_tonnage: Option<String>,
    deadweight: Option<String>,
    length_overall: Option<String>,
    beam: Option<String>,
    draught: Option<String>,
    class: Option<String>,
    class_code: Option<String>,
}

impl AttributeRow {
    pub(crate) fn into_record(self) -> Result<(Mmsi, AttributeRecord), MonitorError> {
        let mmsi = Mmsi::try_from(self.mmsi)?;
        let record = AttributeRecord {
            imo: self.imo,
            mmsi: Some(mmsi.to_string()),
            name: self.name,
            built: self.built,
            flag: self.flag,
            flag_name: self.flag_name,
            vessel_type: self.vessel_type,
            type_name: self.type_name,
            gross_tonnage: self.gross_tonnage,
            deadweight: self.deadweight,
            length_overall: self.length_overall,
            beam: self.beam,
            draught: self.draught,
            class: self.class,
            class_code: self.class_code,
        };
        Ok((mmsi, record))
    }
}
