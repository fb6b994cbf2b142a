//! Fuzzy-inference offloading controller
//!
//! Maps five task/node attributes to a placement label in three steps:
//!
//! ```text
//! crisp inputs ──► fuzzify (trapezoids) ──► rules (min / max) ──► winner-take-all
//! ```
//!
//! The engine holds no state between calls.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionLocation, ResourceType};

/// Membership degrees of one input in its three linguistic sets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Membership {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

/// Piecewise-linear breakpoints for one input variable.
///
/// Low is 1 up to `low_full`, falls to 0 at `low_zero`. Medium rises over
/// `[low_full, low_zero]`, plateaus until `medium_end`, falls to 0 at
/// `medium_zero`. High rises from `medium_end` to `high_full`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoints {
    pub low_full: f64,
    pub low_zero: f64,
    pub medium_end: f64,
    pub medium_zero: f64,
    pub high_full: f64,
}

impl Breakpoints {
    pub const CPU_DEMAND: Breakpoints = Breakpoints {
        low_full: 3000.0,
        low_zero: 6000.0,
        medium_end: 8000.0,
        medium_zero: 10000.0,
        high_full: 15000.0,
    };

    pub const NETWORK_DEMAND: Breakpoints = Breakpoints {
        low_full: 1500.0,
        low_zero: 2500.0,
        medium_end: 3000.0,
        medium_zero: 3500.0,
        high_full: 5000.0,
    };

    pub const DELAY_SENSITIVITY: Breakpoints = Breakpoints {
        low_full: 0.1,
        low_zero: 0.5,
        medium_end: 0.7,
        medium_zero: 0.9,
        high_full: 0.9,
    };

    pub const EDGE_UTILIZATION: Breakpoints = Breakpoints {
        low_full: 30.0,
        low_zero: 50.0,
        medium_end: 70.0,
        medium_zero: 80.0,
        high_full: 90.0,
    };

    /// Degrees of membership of `x` in Low / Medium / High
    pub fn fuzzify(&self, x: f64) -> Membership {
        Membership {
            low: falling(x, self.low_full, self.low_zero),
            medium: trapezoid(x, self.low_full, self.low_zero, self.medium_end, self.medium_zero),
            high: rising(x, self.medium_end, self.high_full),
        }
    }
}

/// 1 at or below `a`, 0 at or above `b`, linear between
fn falling(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        1.0
    } else if x >= b {
        0.0
    } else {
        (b - x) / (b - a)
    }
}

/// 0 at or below `a`, 1 at or above `b`, linear between
fn rising(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else {
        (x - a) / (b - a)
    }
}

/// Trapezoid with feet at `a`, `d` and shoulders at `b`, `c`
fn trapezoid(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x <= a || x >= d {
        0.0
    } else if x < b {
        (x - a) / (b - a)
    } else if x <= c {
        1.0
    } else {
        (d - x) / (d - c)
    }
}

/// Fuzzified view of all four continuous inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyInputs {
    pub cpu: Membership,
    pub network: Membership,
    pub delay: Membership,
    pub utilization: Membership,
}

/// Aggregated rule strength per output label
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleWeights {
    pub local_edge: f64,
    pub other_edge: f64,
    pub cloud: f64,
}

impl RuleWeights {
    /// Fuzzy OR of a rule's strength into one label
    fn accumulate(&mut self, label: ExecutionLocation, strength: f64) {
        let slot = match label {
            ExecutionLocation::LocalEdge => &mut self.local_edge,
            ExecutionLocation::OtherEdge => &mut self.other_edge,
            ExecutionLocation::Cloud => &mut self.cloud,
        };
        *slot = slot.max(strength);
    }

    /// Winner-take-all, ties go LOCAL_EDGE > OTHER_EDGE > CLOUD
    pub fn defuzzify(&self) -> ExecutionLocation {
        let (local, other, cloud) = (self.local_edge, self.other_edge, self.cloud);
        if local >= other && local >= cloud {
            ExecutionLocation::LocalEdge
        } else if other >= local && other >= cloud {
            ExecutionLocation::OtherEdge
        } else {
            ExecutionLocation::Cloud
        }
    }
}

/// Fuzzy decision engine
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyDecisionEngine;

impl FuzzyDecisionEngine {
    pub fn new() -> Self {
        FuzzyDecisionEngine
    }

    /// Step 1: map crisp inputs to membership degrees
    pub fn fuzzify(
        &self,
        cpu_demand: f64,
        network_demand: f64,
        delay_sensitivity: f64,
        edge_utilization: f64,
    ) -> FuzzyInputs {
        FuzzyInputs {
            cpu: Breakpoints::CPU_DEMAND.fuzzify(cpu_demand),
            network: Breakpoints::NETWORK_DEMAND.fuzzify(network_demand),
            delay: Breakpoints::DELAY_SENSITIVITY.fuzzify(delay_sensitivity),
            utilization: Breakpoints::EDGE_UTILIZATION.fuzzify(edge_utilization),
        }
    }

    /// Step 2: fire the rule base, AND = min, OR across rules = max
    pub fn evaluate_rules(&self, inputs: &FuzzyInputs, resource_type: ResourceType) -> RuleWeights {
        let FuzzyInputs { cpu, network, delay, utilization: util } = *inputs;
        let mut weights = RuleWeights::default();

        // Small job on an idle node stays home
        weights.accumulate(ExecutionLocation::LocalEdge, cpu.low.min(util.low));
        // Heavy, delay-tolerant job on a saturated node goes to the cloud
        weights.accumulate(
            ExecutionLocation::Cloud,
            cpu.high.min(util.high).min(delay.low),
        );
        // Medium, delay-critical job on a saturated node goes to a peer
        weights.accumulate(
            ExecutionLocation::OtherEdge,
            cpu.medium.min(util.high).min(delay.high),
        );
        // Bulky, delay-critical payloads are not worth shipping
        weights.accumulate(ExecutionLocation::LocalEdge, network.high.min(delay.high));

        match resource_type {
            ResourceType::High => {
                weights.accumulate(ExecutionLocation::LocalEdge, cpu.high.min(util.low));
            }
            ResourceType::Low => {
                weights.accumulate(ExecutionLocation::OtherEdge, cpu.high.min(util.medium));
            }
        }

        weights
    }

    /// Full decision: fuzzify, evaluate, defuzzify
    pub fn decide(
        &self,
        cpu_demand: f64,
        network_demand: f64,
        delay_sensitivity: f64,
        edge_utilization: f64,
        resource_type: ResourceType,
    ) -> ExecutionLocation {
        let inputs = self.fuzzify(cpu_demand, network_demand, delay_sensitivity, edge_utilization);
        self.evaluate_rules(&inputs, resource_type).defuzzify()
    }
}
