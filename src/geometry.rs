//! Polygon boundary parsing and validation.

use std::collections::HashSet;
use std::fmt::Write;

use geo::{Contains, Coord, LineString, Point};
use serde_json::{Map, Value};

use crate::errors::MonitorError;
use crate::models::Location;

/// Vertex as sent by the map client: an object with `lat` and `lng`,
/// coordinates either numeric or textual
type RawVertex = Map<String, Value>;

/// Closed polygon ring of (longitude, latitude) vertices
///
/// The first vertex always equals the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<Location>,
    shape: geo::Polygon<f64>,
}

impl Polygon {
    /// Parse a JSON array of `{lat, lng}` objects into a closed ring
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        let vertices: Vec<RawVertex> = serde_json::from_str(raw).map_err(|e| {
            MonitorError::InvalidGeometry(format!(
                "polygon must be a JSON array of {{lat, lng}} points: {}",
                e
            ))
        })?;

        let vertices = vertices
            .iter()
            .enumerate()
            .map(|(i, vertex)| {
                let lat = parse_coordinate(vertex.get("lat"), "lat", i)?;
                let lng = parse_coordinate(vertex.get("lng"), "lng", i)?;
                Ok(Location::new(lng, lat))
            })
            .collect::<Result<Vec<_>, MonitorError>>()?;

        Self::close(vertices)
    }

    /// Build a ring from vertices, appending the first vertex if the ring is open
    pub fn close(mut vertices: Vec<Location>) -> Result<Self, MonitorError> {
        for vertex in &vertices {
            if !(-180.0..=180.0).contains(&vertex.lon) || !(-90.0..=90.0).contains(&vertex.lat) {
                return Err(MonitorError::InvalidGeometry(format!(
                    "coordinate ({}, {}) is outside the valid range",
                    vertex.lon, vertex.lat
                )));
            }
        }

        let (first, last) = match (vertices.first(), vertices.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(MonitorError::InvalidGeometry(
                    "polygon has no vertices".to_string(),
                ))
            }
        };

        let open = if first == last {
            &vertices[..vertices.len() - 1]
        } else {
            &vertices[..]
        };
        let distinct = distinct_vertices(open);
        if distinct < 3 {
            return Err(MonitorError::InvalidGeometry(format!(
                "polygon needs at least 3 distinct vertices, got {}",
                distinct
            )));
        }

        if first != last {
            vertices.push(first);
        }

        let exterior: Vec<Coord<f64>> = vertices
            .iter()
            .map(|v| Coord { x: v.lon, y: v.lat })
            .collect();
        let shape = geo::Polygon::new(LineString::new(exterior), Vec::new());

        Ok(Self {
            ring: vertices,
            shape,
        })
    }

    pub fn ring(&self) -> &[Location] {
        &self.ring
    }

    /// Whether the point lies strictly inside the polygon
    ///
    /// Points on the boundary are not contained.
    pub fn contains(&self, point: &Location) -> bool {
        self.shape.contains(&Point::new(point.lon, point.lat))
    }

    /// Well-known text representation, `POLYGON((lon lat, ...))`
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::from("POLYGON((");
        for (i, vertex) in self.ring.iter().enumerate() {
            if i > 0 {
                wkt.push_str(", ");
            }
            // Writing into a String cannot fail
            let _ = write!(wkt, "{} {}", vertex.lon, vertex.lat);
        }
        wkt.push_str("))");
        wkt
    }
}

// -0.0 and 0.0 are the same vertex
fn distinct_vertices(vertices: &[Location]) -> usize {
    vertices
        .iter()
        .map(|v| ((v.lon + 0.0).to_bits(), (v.lat + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

fn parse_coordinate(
    value: Option<&Value>,
    name: &str,
    index: usize,
) -> Result<f64, MonitorError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).ok_or_else(|| {
        MonitorError::InvalidGeometry(format!(
            "invalid coordinates: {} of point {} is not numeric",
            name, index
        ))
    })
}
