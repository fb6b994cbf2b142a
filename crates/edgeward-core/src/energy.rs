//! Transmission energy check
//!
//! Battery bookkeeping lives outside the core. The core only asks whether
//! a device can afford to ship a task off-node.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::types::Task;

/// Decides whether a device has the energy to transmit a task
pub trait EnergyModel {
    fn can_transmit(&self, device: &Device, task: &Task) -> bool;
}

/// Linear cost per kilobyte, as a fraction of a full battery
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearEnergyModel {
    pub battery_fraction_per_kb: f64,
}

impl Default for LinearEnergyModel {
    fn default() -> Self {
        Self {
            // 5000 KB costs 1% of a full battery
            battery_fraction_per_kb: 2e-6,
        }
    }
}

impl LinearEnergyModel {
    pub fn transmission_cost(&self, task: &Task) -> f64 {
        task.network_demand.max(0.0) * self.battery_fraction_per_kb
    }
}

impl EnergyModel for LinearEnergyModel {
    fn can_transmit(&self, device: &Device, task: &Task) -> bool {
        device.battery_level >= self.transmission_cost(task)
    }
}

/// Never refuses a transmission
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlimitedEnergy;

impl EnergyModel for UnlimitedEnergy {
    fn can_transmit(&self, _device: &Device, _task: &Task) -> bool {
        true
    }
}
