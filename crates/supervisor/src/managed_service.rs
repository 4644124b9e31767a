// SPDX-License-Identifier: MIT

//! Managed Service: one logical service registered on the bus, backed by
//! the set of scripts that declared its name.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::RwLock;
use scriptmesh_core::{Endpoint, SubjectRewriter};
use scriptmesh_probe::ExecutionRecord;
use scriptmesh_bus::{
    Bus, BusError, EndpointRegistration, HandlerReply, RequestHandler, ServiceRegistration,
    ServiceRegistrationRequest,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle states a Managed Service moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initialized,
    Serving,
    Stopped,
    Failed,
}

/// An endpoint merged into the effective set, and which script owns it.
#[derive(Debug, Clone)]
struct OwnedEndpoint {
    endpoint: Endpoint,
    owner: PathBuf,
}

struct Inner {
    state: ServiceState,
    scripts: IndexMap<PathBuf, ()>,
    effective_endpoints: IndexMap<String, OwnedEndpoint>,
    version: Option<String>,
    description: Option<String>,
    registration: Option<Box<dyn ServiceRegistration>>,
}

/// Errors from Managed Service lifecycle operations.
#[derive(Debug, Error)]
pub enum ManagedServiceError {
    #[error("bus registration failed: {0}")]
    Registration(#[from] BusError),
}

/// One logical service on the bus, backed by one or more scripts.
pub struct ManagedService<B: Bus> {
    name: String,
    inner: RwLock<Inner>,
    bus: Arc<B>,
    rewriter: SubjectRewriter,
    describe_deadline: Duration,
    handle_deadline: Duration,
}

impl<B: Bus> ManagedService<B> {
    pub fn new(
        name: impl Into<String>,
        bus: Arc<B>,
        rewriter: SubjectRewriter,
        describe_deadline: Duration,
        handle_deadline: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            bus,
            rewriter,
            describe_deadline,
            handle_deadline,
            inner: RwLock::new(Inner {
                state: ServiceState::Uninitialized,
                scripts: IndexMap::new(),
                effective_endpoints: IndexMap::new(),
                version: None,
                description: None,
                registration: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ServiceState {
        self.inner.read().state
    }

    pub fn script_count(&self) -> usize {
        self.inner.read().scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script_count() == 0
    }

    pub fn owns(&self, path: &Path) -> bool {
        self.inner.read().scripts.contains_key(path)
    }

    /// Probe `path` and, if its descriptor's name matches this service,
    /// merge its endpoints. The script is recorded as a member regardless
    /// (matching the original's tolerant grouping).
    pub async fn add_script(&self, path: &Path) {
        {
            let mut inner = self.inner.write();
            inner.scripts.entry(path.to_path_buf()).or_insert(());
        }
        self.merge_one(path).await;
    }

    /// Drop all endpoints owned by `path` and remove it from membership.
    /// Returns `true` if the service is now empty and should be torn down.
    pub fn remove_script(&self, path: &Path) -> bool {
        let mut inner = self.inner.write();
        inner.scripts.shift_remove(path);
        inner.effective_endpoints.retain(|_, owned| owned.owner != path);
        inner.scripts.is_empty()
    }

    /// Rebuild `effective_endpoints` from scratch by re-probing every member
    /// script in insertion order, tolerating individual probe failures.
    pub async fn initialize(&self) {
        let members: Vec<PathBuf> = self.inner.read().scripts.keys().cloned().collect();
        self.inner.write().effective_endpoints.clear();
        for path in &members {
            self.merge_one(path).await;
        }
        let mut inner = self.inner.write();
        if inner.state == ServiceState::Uninitialized {
            inner.state = ServiceState::Initialized;
        }
    }

    /// Probe one member script and merge its endpoints, first-writer-wins.
    async fn merge_one(&self, path: &Path) {
        let descriptor = match scriptmesh_probe::describe(path, self.describe_deadline).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "probe failed during merge, skipping");
                return;
            }
        };
        if descriptor.name != self.name {
            warn!(
                path = %path.display(),
                declared = %descriptor.name,
                service = %self.name,
                "descriptor name disagrees with group, skipping endpoints"
            );
            return;
        }

        let mut inner = self.inner.write();
        if inner.version.is_none() {
            inner.version = descriptor.version.clone();
        }
        if inner.description.is_none() {
            inner.description = descriptor.description.clone();
        }
        for endpoint in descriptor.endpoints {
            let rewritten = self.rewriter.rewrite(&endpoint.subject);
            if inner.effective_endpoints.contains_key(&rewritten) {
                warn!(
                    subject = %rewritten,
                    path = %path.display(),
                    "duplicate endpoint subject dropped, first writer wins"
                );
                continue;
            }
            inner
                .effective_endpoints
                .insert(rewritten, OwnedEndpoint { endpoint, owner: path.to_path_buf() });
        }
    }

    /// Register on the bus and block until `token` is cancelled, then
    /// deregister. Returns once cleanly stopped; registration failure is
    /// surfaced to the caller, who should treat it as a service failure.
    pub async fn serve(self: &Arc<Self>, token: CancellationToken) -> Result<(), ManagedServiceError>
    where
        B: 'static,
    {
        let request = {
            let inner = self.inner.read();
            ServiceRegistrationRequest {
                name: self.name.clone(),
                version: inner.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
                description: inner.description.clone(),
                endpoints: inner
                    .effective_endpoints
                    .iter()
                    .map(|(subject, owned)| EndpointRegistration {
                        subject: subject.clone(),
                        metadata: owned.endpoint.to_bus_metadata(),
                    })
                    .collect(),
            }
        };

        let registration = match self.bus.register_service(request, self.clone()).await {
            Ok(registration) => registration,
            Err(e) => {
                self.inner.write().state = ServiceState::Failed;
                return Err(e.into());
            }
        };

        {
            let mut inner = self.inner.write();
            inner.registration = Some(registration);
            inner.state = ServiceState::Serving;
        }
        info!(service = %self.name, "registered on bus");

        token.cancelled().await;

        let registration = self.inner.write().registration.take();
        if let Some(registration) = registration {
            if let Err(e) = registration.stop().await {
                warn!(service = %self.name, error = %e, "deregistration failed");
            }
        }
        self.inner.write().state = ServiceState::Stopped;
        Ok(())
    }
}

#[async_trait]
impl<B: Bus> RequestHandler for ManagedService<B> {
    async fn handle(&self, subject: &str, payload: Bytes) -> HandlerReply {
        let owner = {
            let inner = self.inner.read();
            inner.effective_endpoints.get(subject).map(|owned| owned.owner.clone())
        };
        let Some(owner) = owner else {
            return HandlerReply::Error { message: format!("no handler for subject {subject}") };
        };
        let declared = self.rewriter.strip(subject);
        let record = scriptmesh_probe::handle(&owner, declared, &payload, self.handle_deadline).await;
        match record {
            ExecutionRecord::Ok { stdout, .. } => HandlerReply::Ok(stdout),
            ExecutionRecord::ScriptFailed { exit_code, stderr, .. } => HandlerReply::Error {
                message: format!(
                    "script exited {exit_code}: {}",
                    String::from_utf8_lossy(&stderr)
                ),
            },
            ExecutionRecord::Timeout => HandlerReply::Error { message: "request timed out".to_string() },
            ExecutionRecord::SpawnFailed { reason } => {
                HandlerReply::Error { message: format!("failed to invoke script: {reason}") }
            }
        }
    }
}

#[cfg(test)]
#[path = "managed_service_tests.rs"]
mod tests;
