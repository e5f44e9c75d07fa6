//! Organization scoping for multi-tenant isolation

use serde::{Deserialize, Serialize};

/// Organization identifier used to scope every storage operation
///
/// Matches the `organization_id` of the authenticated principal; the
/// Postgres backend enforces it with row-level security.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl OrgId {
    /// Create a new organization ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the organization ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
