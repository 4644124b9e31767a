// SPDX-License-Identifier: MIT

//! Builders shared by this crate's and downstream crates' tests.

use crate::descriptor::ServiceDescriptor;
use crate::endpoint::Endpoint;

/// Fluent builder for a [`ServiceDescriptor`] in tests.
pub struct DescriptorBuilder {
    name: String,
    version: Option<String>,
    description: Option<String>,
    endpoints: Vec<Endpoint>,
}

impl DescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), version: None, description: None, endpoints: Vec::new() }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn endpoint(mut self, name: impl Into<String>, subject: impl Into<String>) -> Self {
        self.endpoints.push(Endpoint::new(name, subject));
        self
    }

    pub fn build(self) -> ServiceDescriptor {
        ServiceDescriptor {
            name: self.name,
            version: self.version,
            description: self.description,
            endpoints: self.endpoints,
        }
    }

    pub fn to_json_bytes(self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).expect("descriptor serializes")
    }
}
