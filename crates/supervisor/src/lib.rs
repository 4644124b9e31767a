// SPDX-License-Identifier: MIT

//! Supervisor / Manager: discovers scripts, groups them into Managed
//! Services, and keeps the bus view consistent under continuous change.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backoff;
mod debounce;
mod discovery;
mod managed_service;
mod supervisor;
mod watcher;

pub use backoff::Backoff;
pub use debounce::Debouncer;
pub use managed_service::{ManagedService, ManagedServiceError, ServiceState};
pub use supervisor::{Supervisor, SupervisorConfig};
pub use watcher::RawEvent;
