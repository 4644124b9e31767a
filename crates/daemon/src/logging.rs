// SPDX-License-Identifier: MIT

//! Structured logging: an env-filter-driven subscriber, initialized once at
//! startup, before any other subsystem runs.

use tracing_subscriber::EnvFilter;

/// `default_level` seeds the filter; `RUST_LOG`, if set, narrows it further.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
