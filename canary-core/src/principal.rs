//! Authenticated principal attached to inbound requests
//!
//! Token validation happens upstream; by the time a request reaches the
//! orchestrator it carries a verified principal or has already been
//! rejected with 401/403.

use serde::{Deserialize, Serialize};

/// Verified identity attached to a request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub organization_id: String,
    pub permissions: Vec<String>,
}

impl Principal {
    pub fn new(
        user_id: impl Into<String>,
        organization_id: impl Into<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: organization_id.into(),
            permissions,
        }
    }

    /// Exact-string, case-sensitive permission check
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_exact_match() {
        let principal = Principal::new(
            "user-1",
            "org-1",
            vec!["executions:trigger".to_string(), "executions:read".to_string()],
        );

        assert!(principal.has_permission("executions:trigger"));
        assert!(principal.has_permission("executions:read"));
        assert!(!principal.has_permission("executions:delete"));
    }

    #[test]
    fn test_permission_check_is_case_sensitive() {
        let principal = Principal::new("user-1", "org-1", vec!["Executions:Read".to_string()]);

        assert!(principal.has_permission("Executions:Read"));
        assert!(!principal.has_permission("executions:read"));
    }

    #[test]
    fn test_no_prefix_matching() {
        let principal = Principal::new("user-1", "org-1", vec!["executions".to_string()]);
        assert!(!principal.has_permission("executions:read"));
    }
}
