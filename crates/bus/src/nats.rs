// SPDX-License-Identifier: MIT

//! Concrete [`Bus`] binding onto NATS's request-reply microservices API.

use std::sync::Arc;
use std::time::Duration;

use async_nats::service::ServiceExt;
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::handler::{HandlerReply, RequestHandler};
use crate::registration::{ServiceRegistration, ServiceRegistrationRequest};
use crate::{Bus, BusError};

/// A connected NATS client, shared (cheaply cloned) across every Managed
/// Service that registers through it.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to `url` with a bounded connect timeout.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, BusError> {
        info!(%url, "connecting to bus");
        let options = async_nats::ConnectOptions::new().connection_timeout(connect_timeout);
        let client =
            async_nats::connect_with_options(url, options).await.map_err(|e| {
                BusError::ConnectFailed { url: url.to_string(), reason: e.to_string() }
            })?;
        info!(%url, "connected to bus");
        Ok(Self { client })
    }

    /// Flush any pending outbound traffic. Call during shutdown, after every
    /// Managed Service has deregistered, before dropping the connection.
    pub async fn flush(&self) -> Result<(), BusError> {
        self.client.flush().await.map_err(|e| BusError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn register_service(
        &self,
        request: ServiceRegistrationRequest,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Box<dyn ServiceRegistration>, BusError> {
        let mut builder = self.client.service_builder();
        if let Some(description) = &request.description {
            builder = builder.description(description.clone());
        }
        let service = builder
            .start(request.name.clone(), request.version.clone())
            .await
            .map_err(|e| BusError::RegistrationFailed { reason: e.to_string() })?;

        let mut endpoint_tasks = Vec::with_capacity(request.endpoints.len());
        for endpoint in request.endpoints {
            let config = async_nats::service::endpoint::Config {
                subject: endpoint.subject.clone(),
                metadata: Some(endpoint.metadata.into_iter().collect()),
                ..Default::default()
            };
            let mut group = service
                .endpoint(config)
                .await
                .map_err(|e| BusError::RegistrationFailed { reason: e.to_string() })?;
            let handler = handler.clone();
            let subject = endpoint.subject.clone();
            let task = tokio::spawn(async move {
                while let Some(request) = group.next().await {
                    let payload = request.message.payload.clone();
                    let reply = handler.handle(&subject, payload).await;
                    let outcome = match reply {
                        HandlerReply::Ok(bytes) => request.respond(Ok(bytes)).await,
                        HandlerReply::Error { message } => {
                            request
                                .respond(Err(async_nats::service::error::Error {
                                    code: 500,
                                    status: message,
                                }))
                                .await
                        }
                    };
                    if let Err(e) = outcome {
                        warn!(%subject, error = %e, "failed to send bus reply");
                    }
                }
                debug!(%subject, "endpoint stream closed");
            });
            endpoint_tasks.push(task);
        }

        Ok(Box::new(NatsRegistration { service, endpoint_tasks }))
    }
}

struct NatsRegistration {
    service: async_nats::service::Service,
    endpoint_tasks: Vec<tokio::task::JoinHandle<()>>,
}

#[async_trait]
impl ServiceRegistration for NatsRegistration {
    async fn stop(self: Box<Self>) -> Result<(), BusError> {
        self.service.stop().await.map_err(|e| BusError::Transport(e.to_string()))?;
        for task in self.endpoint_tasks {
            task.abort();
        }
        Ok(())
    }
}
