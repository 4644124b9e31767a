// SPDX-License-Identifier: MIT

//! What a Managed Service hands the bus to register itself, and the handle
//! it gets back.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::BusError;

/// One subject to expose on the bus, with its bus-facing metadata.
#[derive(Debug, Clone)]
pub struct EndpointRegistration {
    pub subject: String,
    pub metadata: IndexMap<String, String>,
}

/// Everything needed to register one logical service on the bus.
#[derive(Debug, Clone)]
pub struct ServiceRegistrationRequest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub endpoints: Vec<EndpointRegistration>,
}

/// An exclusive, live handle to a bus registration. Dropping it without
/// calling `stop` still releases bus-side resources on the next reconnect,
/// but callers should prefer an explicit `stop` for deterministic teardown.
#[async_trait]
pub trait ServiceRegistration: Send + Sync {
    /// Deregister the service from the bus.
    async fn stop(self: Box<Self>) -> Result<(), BusError>;
}
