//! AIS monitor: geofenced queries and a live recent-activity stream over
//! recorded AIS position reports, enriched with static vessel attributes.
//!
//! Position reports are read from a PostGIS database ([`database::Database`])
//! through the [`store::PositionStore`] trait. Results are joined with static
//! attributes by [`resolver::StaticAttributeResolver`], classified by
//! [`classify`] and served over HTTP by [`api`].

pub mod api;
pub mod classify;
pub mod config;
pub mod database;
pub mod errors;
pub mod geometry;
pub mod models;
pub mod pagination;
pub mod query;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod stream;
