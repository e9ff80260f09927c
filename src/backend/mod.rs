//! Service clients the dispatcher calls, one per supported service.

pub mod memory;
pub mod unavailable;

use std::{collections::HashMap, sync::Arc};

use log::{info, warn};

use crate::{
    config,
    core::{BridgeError, BridgeResult, ServiceClient},
    services::ServiceKind,
};

use memory::MemoryClient;
use unavailable::UnavailableClient;

/// Client registry keyed by service. Every supported service always has a client.
#[derive(Clone)]
pub struct Backends {
    clients: HashMap<ServiceKind, Arc<dyn ServiceClient>>,
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

impl Backends {
    /// Registry where every service is unavailable.
    pub fn new() -> Self {
        let clients = ServiceKind::ALL
            .into_iter()
            .map(|kind| {
                let client: Arc<dyn ServiceClient> = Arc::new(UnavailableClient::new(kind));
                (kind, client)
            })
            .collect();
        Self { clients }
    }

    pub fn with_client(mut self, service: ServiceKind, client: Arc<dyn ServiceClient>) -> Self {
        self.clients.insert(service, client);
        self
    }

    /// Build the registry from the `backends` configuration section. Simulated runs are
    /// kept as long as the tracker keeps its records.
    pub fn from_config(
        backends: &HashMap<String, config::Backend>,
        limits: &config::Tracker,
    ) -> BridgeResult<Self> {
        let mut registry = Self::new();
        for (name, backend) in backends {
            let service: ServiceKind = name.parse().map_err(BridgeError::Configuration)?;
            info!(
                "Loaded in-memory backend for {} with {} resources",
                service,
                backend.resources.len()
            );
            registry = registry.with_client(
                service,
                Arc::new(MemoryClient::from_config(service, backend, limits)),
            );
        }

        for service in ServiceKind::ALL {
            if !backends.contains_key(service.as_str()) {
                warn!("No backend configured for {}, calls will fail", service);
            }
        }
        Ok(registry)
    }

    pub fn client(&self, service: ServiceKind) -> Arc<dyn ServiceClient> {
        match self.clients.get(&service) {
            Some(client) => client.clone(),
            None => Arc::new(UnavailableClient::new(service)),
        }
    }
}
