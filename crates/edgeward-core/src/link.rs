//! Device-to-node link quality

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Estimates achievable bandwidth between two points
pub trait LinkModel {
    /// Bandwidth in kbps
    fn bandwidth_kbps(&self, from: &Point, to: &Point) -> f64;
}

/// Bandwidth falls off with distance: `peak / (1 + d / reference)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceLinkModel {
    pub peak_kbps: f64,
    pub reference_distance_m: f64,
}

impl Default for DistanceLinkModel {
    fn default() -> Self {
        Self {
            peak_kbps: 10_000.0,
            reference_distance_m: 100.0,
        }
    }
}

impl LinkModel for DistanceLinkModel {
    fn bandwidth_kbps(&self, from: &Point, to: &Point) -> f64 {
        let reference = self.reference_distance_m.max(f64::EPSILON);
        self.peak_kbps / (1.0 + from.distance_to(to) / reference)
    }
}

/// Same bandwidth everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLinkModel(pub f64);

impl LinkModel for FixedLinkModel {
    fn bandwidth_kbps(&self, _from: &Point, _to: &Point) -> f64 {
        self.0
    }
}
