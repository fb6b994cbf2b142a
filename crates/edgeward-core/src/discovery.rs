//! Service registry for compute nodes
//!
//! Every node the orchestrator creates is published here under a service
//! type, so reporting code can look nodes up without touching the backend.

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Point, ResourceType};

/// Service type published for edge nodes
pub const EDGE_COMPUTE_SERVICE: &str = "edge-compute";

/// Service type published for the cloud node
pub const CLOUD_COMPUTE_SERVICE: &str = "cloud-compute";

/// A published compute service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_type: String,
    pub node: NodeId,
    pub location: Option<Point>,
    pub capacity_mips: f64,
    pub resource_type: Option<ResourceType>,
    /// Edge hardware
    pub ram_mb: Option<u64>,
    pub storage_mb: Option<u64>,
    /// Cloud uplink
    pub bandwidth_kbps: Option<f64>,
}

/// Lookup of compute services by type
pub trait ServiceRegistry {
    fn register(&mut self, record: ServiceRecord);

    fn deregister(&mut self, node: NodeId);

    /// All services of a type, in registration order
    fn find(&self, service_type: &str) -> Vec<ServiceRecord>;
}

/// Registry kept in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceRegistry {
    records: Vec<ServiceRecord>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn register(&mut self, record: ServiceRecord) {
        self.records
            .retain(|r| !(r.node == record.node && r.service_type == record.service_type));
        self.records.push(record);
    }

    fn deregister(&mut self, node: NodeId) {
        self.records.retain(|r| r.node != node);
    }

    fn find(&self, service_type: &str) -> Vec<ServiceRecord> {
        self.records
            .iter()
            .filter(|r| r.service_type == service_type)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(service_type: &str, node: u32) -> ServiceRecord {
        ServiceRecord {
            service_type: service_type.to_string(),
            node: NodeId(node),
            location: None,
            capacity_mips: 1000.0,
            resource_type: None,
            ram_mb: None,
            storage_mb: None,
            bandwidth_kbps: None,
        }
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = InMemoryServiceRegistry::new();
        registry.register(record(EDGE_COMPUTE_SERVICE, 0));
        registry.register(record(EDGE_COMPUTE_SERVICE, 1));
        registry.register(record(CLOUD_COMPUTE_SERVICE, 2));

        let edges = registry.find(EDGE_COMPUTE_SERVICE);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].node, NodeId(0));
        assert!(registry.find("storage").is_empty());
    }

    #[test]
    fn test_reregister_replaces_and_deregister_removes() {
        let mut registry = InMemoryServiceRegistry::new();
        registry.register(record(EDGE_COMPUTE_SERVICE, 0));
        let mut updated = record(EDGE_COMPUTE_SERVICE, 0);
        updated.capacity_mips = 5000.0;
        registry.register(updated);

        let edges = registry.find(EDGE_COMPUTE_SERVICE);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].capacity_mips, 5000.0);

        registry.deregister(NodeId(0));
        assert!(registry.find(EDGE_COMPUTE_SERVICE).is_empty());
    }
}
