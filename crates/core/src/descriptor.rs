// SPDX-License-Identifier: MIT

//! Service Descriptor: what a script reports in `info` mode, and its
//! validation rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::Endpoint;

/// A script's self-description, produced fresh on every `info` probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub endpoints: Vec<Endpoint>,
}

/// Failure to deserialize the raw bytes a script wrote to stdout.
#[derive(Debug, Error)]
#[error("descriptor is not valid JSON: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// A structural defect in an otherwise well-formed descriptor.
///
/// Variants are checked and reported in the order they are declared here;
/// the first violation found is the one returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name is empty after trimming")]
    EmptyName,
    #[error("descriptor declares no endpoints")]
    EmptyEndpoints,
    #[error("endpoint at index {index} has an empty name")]
    EmptyEndpointName { index: usize },
    #[error("endpoint {name:?} has an empty subject")]
    EmptyEndpointSubject { name: String },
    #[error("endpoint {name:?} subject {subject:?} contains disallowed characters")]
    InvalidSubjectChars { name: String, subject: String },
    #[error("duplicate endpoint name {name:?}")]
    DuplicateEndpointName { name: String },
    #[error("duplicate endpoint subject {subject:?}")]
    DuplicateEndpointSubject { subject: String },
}

/// Parse a raw `info` response into a descriptor. Does not validate.
pub fn parse(bytes: &[u8]) -> Result<ServiceDescriptor, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Check the structural invariants a descriptor must satisfy to be usable.
///
/// Checks run in a fixed order (name, endpoint presence, per-endpoint shape,
/// then cross-endpoint duplicates) and return on the first failure.
pub fn validate(descriptor: &ServiceDescriptor) -> Result<(), ValidationError> {
    if descriptor.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if descriptor.endpoints.is_empty() {
        return Err(ValidationError::EmptyEndpoints);
    }
    for (index, ep) in descriptor.endpoints.iter().enumerate() {
        if ep.name.trim().is_empty() {
            return Err(ValidationError::EmptyEndpointName { index });
        }
        if ep.subject.is_empty() {
            return Err(ValidationError::EmptyEndpointSubject { name: ep.name.clone() });
        }
        if !Endpoint::subject_is_well_formed(&ep.subject) {
            return Err(ValidationError::InvalidSubjectChars {
                name: ep.name.clone(),
                subject: ep.subject.clone(),
            });
        }
    }
    let mut seen_names = HashSet::new();
    for ep in &descriptor.endpoints {
        if !seen_names.insert(ep.name.as_str()) {
            return Err(ValidationError::DuplicateEndpointName { name: ep.name.clone() });
        }
    }
    let mut seen_subjects = HashSet::new();
    for ep in &descriptor.endpoints {
        if !seen_subjects.insert(ep.subject.as_str()) {
            return Err(ValidationError::DuplicateEndpointSubject { subject: ep.subject.clone() });
        }
    }
    Ok(())
}

/// Parse and validate in one step — the form most callers want.
pub fn parse_and_validate(bytes: &[u8]) -> Result<ServiceDescriptor, DescriptorError> {
    let descriptor = parse(bytes)?;
    validate(&descriptor)?;
    Ok(descriptor)
}

/// Either stage of turning raw bytes into a usable descriptor can fail.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
