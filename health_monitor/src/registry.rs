//! Registry of monitored services

use crate::status::ServiceDescriptor;
use std::sync::Arc;

/// Immutable, cheaply cloneable list of monitored services.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<[ServiceDescriptor]>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self {
            services: services.into(),
        }
    }

    /// Exact, case-sensitive lookup
    pub fn find(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl From<Vec<ServiceDescriptor>> for ServiceRegistry {
    fn from(services: Vec<ServiceDescriptor>) -> Self {
        Self::new(services)
    }
}
