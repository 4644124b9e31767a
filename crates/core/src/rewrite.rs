// SPDX-License-Identifier: MIT

//! Subject rewriting: namespacing a declared subject by a host identifier
//! so many daemon instances can share one bus.

/// Prefixes/strips a host identifier on subject names.
///
/// Holds only the resolved host string and performs no I/O — hostname
/// resolution (see [`resolve_host_id`]) happens once, at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRewriter {
    host: String,
}

impl SubjectRewriter {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `declared_subject` -> `"<host>.<declared_subject>"`.
    pub fn rewrite(&self, declared_subject: &str) -> String {
        format!("{}.{}", self.host, declared_subject)
    }

    /// Inverse of [`rewrite`](Self::rewrite). Returns the input unchanged if
    /// it does not begin with the host prefix followed by a dot; partial
    /// matches are not stripped.
    pub fn strip<'a>(&self, rewritten_subject: &'a str) -> &'a str {
        let prefix_len = self.host.len() + 1;
        if rewritten_subject.len() > prefix_len
            && rewritten_subject.as_bytes()[self.host.len()] == b'.'
            && rewritten_subject.starts_with(self.host.as_str())
        {
            &rewritten_subject[prefix_len..]
        } else {
            rewritten_subject
        }
    }
}

/// Resolve the configured host identifier: an explicit string, or `auto` to
/// use the OS hostname. Falls back to `"unknown"` (logged at warn) if
/// hostname resolution fails.
pub fn resolve_host_id(configured: &str) -> String {
    if configured != "auto" {
        return configured.to_string();
    }
    match hostname_string() {
        Some(host) => host,
        None => {
            tracing::warn!("hostname resolution failed, using \"unknown\" as host identifier");
            "unknown".to_string()
        }
    }
}

fn hostname_string() -> Option<String> {
    hostname::get().ok()?.into_string().ok()
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
