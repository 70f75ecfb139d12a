//! Static vessel attribute resolution.
//!
//! Sources are consulted in fixed priority order: the primary collection,
//! the secondary collection, then the identity fallback registry loaded at
//! startup. The first source with a non-empty record wins, and any field it
//! lacks is replaced with [`SENTINEL`](crate::models::SENTINEL) on its own.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::errors::MonitorError;
use crate::models::{AttributeRecord, Mmsi, StaticAttributes};
use crate::store::AttributeMap;

/// Read-only identity → attributes mapping, keyed by MMSI as text
#[derive(Debug, Clone, Default)]
pub struct FallbackRegistry {
    records: HashMap<String, AttributeRecord>,
}

impl FallbackRegistry {
    pub fn new(records: HashMap<String, AttributeRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON object of `{"<mmsi>": {...attributes}}`
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let records: HashMap<String, AttributeRecord> = serde_json::from_str(json)?;
        Ok(Self::new(
            records
                .into_iter()
                .map(|(key, record)| (key.trim().to_string(), record))
                .collect(),
        ))
    }

    /// Load the registry from a JSON file
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let json = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&json)?;
        info!(
            "Loaded {} fallback vessel records from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn get(&self, mmsi: Mmsi) -> Option<&AttributeRecord> {
        self.records.get(&mmsi.to_string())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Resolves static attributes; never fails
#[derive(Debug, Clone, Default)]
pub struct StaticAttributeResolver {
    fallback: Arc<FallbackRegistry>,
}

impl StaticAttributeResolver {
    pub fn new(fallback: Arc<FallbackRegistry>) -> Self {
        Self { fallback }
    }

    /// Resolve one vessel from whatever records the sources returned
    pub fn resolve(
        &self,
        mmsi: Mmsi,
        primary: Option<&AttributeRecord>,
        secondary: Option<&AttributeRecord>,
    ) -> StaticAttributes {
        let found = [primary, secondary, self.fallback.get(mmsi)]
            .into_iter()
            .flatten()
            .find(|record| !record.is_empty());

        match found {
            Some(record) => StaticAttributes::from_record(record),
            None => StaticAttributes::default(),
        }
    }

    /// Resolve one vessel against per-source lookup results
    pub fn resolve_from(
        &self,
        mmsi: Mmsi,
        primary: &AttributeMap,
        secondary: &AttributeMap,
    ) -> StaticAttributes {
        self.resolve(mmsi, primary.get(&mmsi), secondary.get(&mmsi))
    }
}
