// SPDX-License-Identifier: MIT

//! In-memory [`Bus`] double for unit-testing Managed Services and the
//! Supervisor without a real NATS server.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::handler::{HandlerReply, RequestHandler};
use crate::registration::{ServiceRegistration, ServiceRegistrationRequest};
use crate::{Bus, BusError};

/// A snapshot of one live registration, for test assertions.
#[derive(Clone)]
pub struct RecordedRegistration {
    pub request: ServiceRegistrationRequest,
    pub handler: Arc<dyn RequestHandler>,
}

struct FakeBusState {
    registrations: IndexMap<String, RecordedRegistration>,
    fail_next: Option<String>,
    total_registrations: u64,
}

/// Records every `register_service` call and lets tests dispatch requests
/// straight into the registered handler, bypassing any real transport.
#[derive(Clone)]
pub struct FakeBus {
    state: Arc<Mutex<FakeBusState>>,
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeBusState {
                registrations: IndexMap::new(),
                fail_next: None,
                total_registrations: 0,
            })),
        }
    }

    /// Cumulative count of successful `register_service` calls, across every
    /// service name, since this `FakeBus` was created. Useful for asserting
    /// how many times a service was torn down and reconstituted.
    pub fn total_registrations(&self) -> u64 {
        self.state.lock().total_registrations
    }

    /// Make the next `register_service` call fail with `reason`.
    pub fn fail_next_registration(&self, reason: impl Into<String>) {
        self.state.lock().fail_next = Some(reason.into());
    }

    /// Names of services currently registered.
    pub fn registered_services(&self) -> Vec<String> {
        self.state.lock().registrations.keys().cloned().collect()
    }

    /// The full registration request last seen for `service_name`, if live.
    pub fn registration_for(&self, service_name: &str) -> Option<ServiceRegistrationRequest> {
        self.state.lock().registrations.get(service_name).map(|r| r.request.clone())
    }

    /// Drive a request straight into the handler registered for `service_name`.
    pub async fn dispatch(
        &self,
        service_name: &str,
        subject: &str,
        payload: bytes::Bytes,
    ) -> Option<HandlerReply> {
        let handler = self.state.lock().registrations.get(service_name).map(|r| r.handler.clone())?;
        Some(handler.handle(subject, payload).await)
    }
}

#[async_trait]
impl Bus for FakeBus {
    async fn register_service(
        &self,
        request: ServiceRegistrationRequest,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Box<dyn ServiceRegistration>, BusError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next.take() {
            return Err(BusError::RegistrationFailed { reason });
        }
        let name = request.name.clone();
        state.registrations.insert(name.clone(), RecordedRegistration { request, handler });
        state.total_registrations += 1;
        drop(state);
        Ok(Box::new(FakeRegistration { service_name: name, state: self.state.clone() }))
    }
}

pub struct FakeRegistration {
    service_name: String,
    state: Arc<Mutex<FakeBusState>>,
}

#[async_trait]
impl ServiceRegistration for FakeRegistration {
    async fn stop(self: Box<Self>) -> Result<(), BusError> {
        self.state.lock().registrations.shift_remove(&self.service_name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
