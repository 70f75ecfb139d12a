//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::classify::{self, ObjectClassification};
use crate::errors::MonitorError;
use serde_helpers::*;

/// Value substituted for every static attribute no source could provide
pub const SENTINEL: &str = "-";

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = MonitorError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 999_999_999 {
            return Err(MonitorError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<i32> for Mmsi {
    type Error = MonitorError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let unsigned =
            u32::try_from(value).map_err(|_| MonitorError::InvalidMmsi(value.to_string()))?;
        Self::try_from(unsigned)
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = MonitorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| MonitorError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl From<Mmsi> for u32 {
    fn from(mmsi: Mmsi) -> Self {
        mmsi.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// MMSI as stored in the database (`INTEGER` column)
    pub(crate) fn as_db(&self) -> i32 {
        // 999_999_999 < i32::MAX
        self.0 as i32
    }
}

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    /// Longitude, -180 - 180
    pub lon: f64,
    /// Latitude, -90 - 90
    pub lat: f64,
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

// Serialized as a GeoJSON point, the shape the map front end consumes
impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut point = serializer.serialize_struct("Point", 2)?;
        point.serialize_field("type", "Point")?;
        point.serialize_field("coordinates", &[self.lon, self.lat])?;
        point.end()
    }
}

/// Stored vessel position report
///
/// Read-only projection of a row written by the ingestion process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    /// Ingestion sequence number, used to break timestamp ties
    #[serde(skip)]
    pub sequence: i64,
    pub mmsi: Mmsi,
    /// Creation instant of the report
    pub timestamp: DateTime<Utc>,
    pub location: Location,
    /// Speed over ground in knots
    pub speed_over_ground: Option<f64>,
    /// Course over ground in degrees
    pub course_over_ground: Option<f64>,
    /// Heading in degrees (0-359)
    pub heading: Option<u16>,
    /// Rate of turn, degrees per minute
    pub rate_of_turn: Option<f64>,
    /// Navigational status code, 0 - 15
    pub navigation_status: Option<u8>,
    /// AIS message type code, 1 - 27
    pub message_type: u16,
    /// Transponder / device category
    pub ais_type: Option<String>,
}

/// Static vessel attributes as found in one source
///
/// Every field is optional: sources are incomplete in arbitrary ways.
/// Numeric values are carried as text, since sources disagree on types.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AttributeRecord {
    #[serde(rename = "IMO", default, deserialize_with = "deserialize_lenient_string")]
    pub imo: Option<String>,
    #[serde(rename = "MMSI", default, deserialize_with = "deserialize_lenient_string")]
    pub mmsi: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub built: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub flag: Option<String>,
    #[serde(rename = "flagName", default, deserialize_with = "deserialize_lenient_string")]
    pub flag_name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_lenient_string")]
    pub vessel_type: Option<String>,
    #[serde(rename = "typeName", default, deserialize_with = "deserialize_lenient_string")]
    pub type_name: Option<String>,
    #[serde(rename = "GT", default, deserialize_with = "deserialize_lenient_string")]
    pub gross_tonnage: Option<String>,
    #[serde(rename = "DWT", default, deserialize_with = "deserialize_lenient_string")]
    pub deadweight: Option<String>,
    #[serde(rename = "LOA", default, deserialize_with = "deserialize_lenient_string")]
    pub length_overall: Option<String>,
    #[serde(rename = "BEAM", default, deserialize_with = "deserialize_lenient_string")]
    pub beam: Option<String>,
    #[serde(rename = "DRAUGHT", default, deserialize_with = "deserialize_lenient_string")]
    pub draught: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub class: Option<String>,
    #[serde(rename = "classCode", default, deserialize_with = "deserialize_lenient_string")]
    pub class_code: Option<String>,
}

impl AttributeRecord {
    /// True if no field carries a usable value
    pub fn is_empty(&self) -> bool {
        [
            &self.imo,
            &self.mmsi,
            &self.name,
            &self.built,
            &self.flag,
            &self.flag_name,
            &self.vessel_type,
            &self.type_name,
            &self.gross_tonnage,
            &self.deadweight,
            &self.length_overall,
            &self.beam,
            &self.draught,
            &self.class,
            &self.class_code,
        ]
        .iter()
        .all(|field| usable(field).is_none())
    }
}

/// Resolved static vessel attributes
///
/// Missing values are replaced with [`SENTINEL`], never left absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticAttributes {
    #[serde(rename = "IMO")]
    pub imo: String,
    #[serde(rename = "MMSI")]
    pub mmsi: String,
    pub name: String,
    pub built: String,
    pub flag: String,
    #[serde(rename = "flagName")]
    pub flag_name: String,
    #[serde(rename = "type")]
    pub vessel_type: String,
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(rename = "GT")]
    pub gross_tonnage: String,
    #[serde(rename = "DWT")]
    pub deadweight: String,
    #[serde(rename = "LOA")]
    pub length_overall: String,
    #[serde(rename = "BEAM")]
    pub beam: String,
    #[serde(rename = "DRAUGHT")]
    pub draught: String,
    pub class: String,
    #[serde(rename = "classCode")]
    pub class_code: String,
}

impl Default for StaticAttributes {
    fn default() -> Self {
        Self::from_record(&AttributeRecord::default())
    }
}

impl StaticAttributes {
    /// Normalize a source record, filling each missing field independently
    pub fn from_record(record: &AttributeRecord) -> Self {
        let field = |value: &Option<String>| usable(value).unwrap_or(SENTINEL).to_string();
        Self {
            imo: field(&record.imo),
            mmsi: field(&record.mmsi),
            name: field(&record.name),
            built: field(&record.built),
            flag: field(&record.flag),
            flag_name: field(&record.flag_name),
            vessel_type: field(&record.vessel_type),
            type_name: field(&record.type_name),
            gross_tonnage: field(&record.gross_tonnage),
            deadweight: field(&record.deadweight),
            length_overall: field(&record.length_overall),
            beam: field(&record.beam),
            draught: field(&record.draught),
            class: field(&record.class),
            class_code: field(&record.class_code),
        }
    }

    /// Numeric AIS ship-and-cargo type code, if known
    pub fn vessel_type_code(&self) -> Option<u8> {
        self.vessel_type.trim().parse().ok()
    }
}

fn usable(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != SENTINEL)
}

/// Position report joined with static attributes and derived fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedObject {
    #[serde(flatten)]
    pub report: PositionReport,
    pub static_attributes: StaticAttributes,
    /// Minutes elapsed since the report timestamp, rounded down
    pub data_age_minutes: i64,
    pub object_classification: ObjectClassification,
    pub navigation_status_description: &'static str,
    pub message_type_description: &'static str,
    pub vessel_type_description: &'static str,
}

impl ResolvedObject {
    pub fn new(report: PositionReport, attributes: StaticAttributes, now: DateTime<Utc>) -> Self {
        let data_age_minutes = (now - report.timestamp)
            .num_milliseconds()
            .div_euclid(60_000);
        let vessel_type = attributes.vessel_type_code();

        Self {
            object_classification: classify::classify(report.message_type),
            navigation_status_description: classify::navigation_status_description(
                report.navigation_status,
            ),
            message_type_description: classify::message_type_description(report.message_type),
            vessel_type_description: classify::vessel_type_description(vessel_type),
            data_age_minutes,
            static_attributes: attributes,
            report,
        }
    }
}

/// Custom deserializers
mod serde_helpers {
    use serde::{self, Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept strings, numbers and booleans; map null and blank to None
    pub fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report_at(timestamp: DateTime<Utc>) -> PositionReport {
        PositionReport {
            sequence: 1,
            mmsi: Mmsi::try_from(230_123_456u32).unwrap(),
            timestamp,
            location: Location::new(24.945831, 60.192059),
            speed_over_ground: Some(10.5),
            course_over_ground: Some(123.4),
            heading: Some(125),
            rate_of_turn: None,
            navigation_status: Some(0),
            message_type: 1,
            ais_type: Some("A".to_string()),
        }
    }

    #[test]
    fn mmsi_rejects_ten_digits() {
        assert!(Mmsi::try_from(1_000_000_000u32).is_err());
        assert!(Mmsi::try_from(-5i32).is_err());
        assert_eq!(Mmsi::try_from(" 230123456 ").unwrap().value(), 230_123_456);
    }

    #[test]
    fn parse_attribute_record() {
        let s = r#"{
            "IMO": 9267560,
            "MMSI": "230123456",
            "name": "SUULA",
            "built": 2003,
            "flag": "FI",
            "flagName": "",
            "type": null,
            "GT": 11000.5
        }"#;
        let record: AttributeRecord = serde_json::from_str(s).unwrap();
        let expected = AttributeRecord {
            imo: Some("9267560".to_string()),
            mmsi: Some("230123456".to_string()),
            name: Some("SUULA".to_string()),
            built: Some("2003".to_string()),
            flag: Some("FI".to_string()),
            gross_tonnage: Some("11000.5".to_string()),
            ..Default::default()
        };

        assert_eq!(record, expected);
    }

    #[test]
    fn attributes_fill_missing_fields() {
        let record = AttributeRecord {
            name: Some("ARUNA CIHAN".to_string()),
            flag: Some("  ".to_string()),
            vessel_type: Some("70".to_string()),
            ..Default::default()
        };
        let attributes = StaticAttributes::from_record(&record);

        assert_eq!(attributes.name, "ARUNA CIHAN");
        assert_eq!(attributes.flag, SENTINEL);
        assert_eq!(attributes.imo, SENTINEL);
        assert_eq!(attributes.vessel_type_code(), Some(70));
    }

    #[test]
    fn empty_record_detection() {
        assert!(AttributeRecord::default().is_empty());
        let record = AttributeRecord {
            name: Some(SENTINEL.to_string()),
            ..Default::default()
        };
        assert!(record.is_empty());
    }

    #[test]
    fn data_age_is_floored() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 2, 59).unwrap();
        let resolved = ResolvedObject::new(report_at(timestamp), StaticAttributes::default(), now);

        assert_eq!(resolved.data_age_minutes, 2);
        assert!(resolved.object_classification.is_vessel);
        assert_eq!(resolved.vessel_type_description, "Unknown");
    }

    #[test]
    fn serialize_resolved_object() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let resolved = ResolvedObject::new(report_at(timestamp), StaticAttributes::default(), timestamp);
        let json = serde_json::to_value(&resolved).unwrap();

        assert_eq!(json["mmsi"], 230_123_456);
        assert_eq!(json["location"]["type"], "Point");
        assert_eq!(json["location"]["coordinates"][0], 24.945831);
        assert_eq!(json["speedOverGround"], 10.5);
        assert_eq!(json["staticAttributes"]["IMO"], "-");
        assert_eq!(json["objectClassification"]["type"], "VESSEL");
        assert_eq!(json["dataAgeMinutes"], 0);
        assert!(json.get("sequence").is_none());
    }
}
