// SPDX-License-Identifier: MIT

//! Bus Adapter: the abstraction a Managed Service registers itself against,
//! and the concrete NATS microservices binding used in production.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod handler;
mod nats;
mod registration;

#[cfg(any(test, feature = "test-support"))]
mod fake;

use async_trait::async_trait;
use thiserror::Error;

pub use handler::{HandlerReply, RequestHandler};
pub use nats::NatsBus;
pub use registration::{EndpointRegistration, ServiceRegistration, ServiceRegistrationRequest};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBus, FakeRegistration, RecordedRegistration};

/// Failures from connecting to, registering on, or publishing to the bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to bus at {url}: {reason}")]
    ConnectFailed { url: String, reason: String },
    #[error("service registration failed: {reason}")]
    RegistrationFailed { reason: String },
    #[error("bus transport error: {0}")]
    Transport(String),
}

/// Abstraction a Managed Service registers against. Implemented once for a
/// real message bus (`NatsBus`) and once for tests (`FakeBus`).
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// Register a service with the given name/version/description and
    /// endpoint set, dispatching inbound requests to `handler`. Returns a
    /// handle whose `stop` deregisters the service.
    async fn register_service(
        &self,
        request: ServiceRegistrationRequest,
        handler: std::sync::Arc<dyn RequestHandler>,
    ) -> Result<Box<dyn ServiceRegistration>, BusError>;
}
