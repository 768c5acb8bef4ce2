//! MesoWest/Synoptic time-series records and their conversion into [`Station`]s.
//!
//! [`Station`]: crate::types::station::Station

pub mod error;
pub mod loader;
pub mod record;
