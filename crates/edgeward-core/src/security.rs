//! Task integrity seal
//!
//! Stand-in for the authentication layer: a BLAKE3 digest over the fields a
//! task is created with. Nodes re-check it before running a task, so a
//! payload that was modified in transit shows up as an integrity failure.

use crate::types::{SecurityLevel, Task};

/// Hex digest over identity and demand fields
pub(crate) fn digest(task: &Task) -> String {
    let mut hasher = blake3::Hasher::new();
    // Length prefixes keep `("ab", "c")` and `("a", "bc")` apart
    for field in [task.id.as_bytes(), task.source_device.as_bytes()] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    hasher.update(&task.cpu_demand.to_bits().to_le_bytes());
    hasher.update(&task.network_demand.to_bits().to_le_bytes());
    hasher.update(&task.delay_sensitivity.to_bits().to_le_bytes());
    hasher.update(&[security_tag(task.security_level)]);
    hasher.finalize().to_hex().to_string()
}

fn security_tag(level: SecurityLevel) -> u8 {
    match level {
        SecurityLevel::Low => 0,
        SecurityLevel::Medium => 1,
        SecurityLevel::High => 2,
    }
}

/// Simulate an in-transit modification of a task payload
pub fn tamper(task: &mut Task) {
    task.cpu_demand *= 1.25;
    task.network_demand += 1.0;
}
