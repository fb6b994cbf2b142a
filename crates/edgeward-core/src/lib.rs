//! Edgeward Core - offloading decisions for IoT tasks
//!
//! Decides, for each task a device generates, whether it runs on the
//! device's nearest edge node, on a less-loaded peer, or in the cloud, and
//! simulates the resulting execution.
//!
//! Key types:
//! - [`FuzzyDecisionEngine`] - stateless fuzzy controller (the placement rule base)
//! - [`EdgeNode`] / [`CloudNode`] - FIFO queues with a smoothed utilization
//! - [`Device`] - task generation and mobility
//! - [`OffloadingOrchestrator`] - binding, overrides, routing, statistics
//! - [`ComputeBackend`] - the only interface the orchestrator uses to reach nodes

pub mod backend;
pub mod checkpoint;
pub mod device;
pub mod discovery;
pub mod energy;
pub mod error;
pub mod fuzzy;
pub mod link;
pub mod migration;
pub mod node;
pub mod orchestrator;
pub mod security;
pub mod stats;
pub mod types;

pub use backend::{ComputeBackend, EdgeNodeView, NativeBackend, TaskReport};
pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, NoCheckpoints};
pub use device::{APP_PROFILES, AppProfile, Device};
pub use discovery::{InMemoryServiceRegistry, ServiceRecord, ServiceRegistry};
pub use energy::{EnergyModel, LinearEnergyModel, UnlimitedEnergy};
pub use error::{CoreError, Result};
pub use fuzzy::{FuzzyDecisionEngine, Membership, RuleWeights};
pub use link::{DistanceLinkModel, FixedLinkModel, LinkModel};
pub use migration::{AlwaysAccept, LossyMigration, MigrationProtocol};
pub use node::{CloudNode, CloudNodeSpec, EdgeNode, EdgeNodeSpec, ResourceNode};
pub use orchestrator::{FailoverReport, OffloadingOrchestrator, Placement};
pub use stats::{StatisticsAggregator, SystemStatistics, TickStatistics};
pub use types::*;
