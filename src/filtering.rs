//! Station selection: domain membership and network allow-list.

use crate::types::bounding_box::BoundingBox;
use crate::types::station::StationSource;
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of [`StationFilter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    /// The station lies outside the model's bounding box.
    OutsideDomain,
    /// The station's network is not in the allow-list.
    ExcludedNetwork,
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDecision::Accept => write!(f, "accepted"),
            FilterDecision::OutsideDomain => write!(f, "outside the model domain"),
            FilterDecision::ExcludedNetwork => write!(f, "not in an allowed network"),
        }
    }
}

/// Inclusive bounding-box test on the station location.
pub fn in_domain(station: &impl StationSource, bbox: &BoundingBox) -> bool {
    let location = station.location();
    bbox.contains(location.latitude, location.longitude)
}

/// Exact match of the (already truncated) network id against the allow-list.
pub fn in_allowed_network(station: &impl StationSource, allowed: &BTreeSet<i64>) -> bool {
    allowed.contains(&station.network_id())
}

/// Both checks bundled for a single model domain.
#[derive(Debug, Clone, PartialEq)]
pub struct StationFilter {
    bbox: BoundingBox,
    allowed_networks: BTreeSet<i64>,
}

impl StationFilter {
    pub fn new(bbox: BoundingBox, allowed_networks: impl IntoIterator<Item = i64>) -> Self {
        Self {
            bbox,
            allowed_networks: allowed_networks.into_iter().collect(),
        }
    }

    /// The domain is checked first, so a station failing both is reported as outside.
    pub fn check(&self, station: &impl StationSource) -> FilterDecision {
        if !in_domain(station, &self.bbox) {
            FilterDecision::OutsideDomain
        } else if !in_allowed_network(station, &self.allowed_networks) {
            FilterDecision::ExcludedNetwork
        } else {
            FilterDecision::Accept
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn allowed_networks(&self) -> &BTreeSet<i64> {
        &self.allowed_networks
    }
}
