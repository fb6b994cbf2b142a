//! Edgeward Simulation Engine
//!
//! Drives the offloading orchestrator from `edgeward-core` through a
//! seeded, tick-based simulation of mobile devices, edge nodes and a cloud.
//!
//! ```no_run
//! use edgeward_simulation_engine::{config::SimulationConfig, simulator::Simulator};
//!
//! let result = Simulator::new(SimulationConfig::default())?.run();
//! println!("{} tasks completed", result.statistics.completed_tasks());
//! # Ok::<(), edgeward_simulation_engine::error::SimulationError>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod simulator;

pub use config::SimulationConfig;
pub use error::{Result, SimulationError};
pub use simulator::{SimulationResult, Simulator};
