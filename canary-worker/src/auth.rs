//! Principal extraction and permission checks
//!
//! Token validation happens in the upstream auth middleware; the worker
//! trusts the identity headers that middleware attaches and only performs
//! the exact-string permission checks. Requests without a principal are
//! rejected with 401, requests missing a permission with 403.

use axum::http::HeaderMap;
use canary_core::Principal;

/// Header carrying the authenticated user ID
pub const USER_HEADER: &str = "x-auth-user";

/// Header carrying the organization ID
pub const ORG_HEADER: &str = "x-auth-org";

/// Header carrying the comma-separated permission list
pub const PERMISSIONS_HEADER: &str = "x-auth-permissions";

/// Permission required to trigger executions
pub const PERM_TRIGGER: &str = "executions:trigger";

/// Permission required to read execution history
pub const PERM_READ: &str = "executions:read";

/// Error types for authentication and authorization
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid principal")]
    Unauthenticated,

    #[error("Missing permission: {0}")]
    Forbidden(String),
}

/// Build the verified principal from the middleware-supplied headers
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AuthError> {
    let user_id = header_value(headers, USER_HEADER)?;
    let organization_id = header_value(headers, ORG_HEADER)?;

    let permissions = headers
        .get(PERMISSIONS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Principal::new(user_id, organization_id, permissions))
}

/// Require an exact, case-sensitive permission on the principal
pub fn require_permission(principal: &Principal, permission: &str) -> Result<(), AuthError> {
    if principal.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(permission.to_string()))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or(AuthError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(user: &str, org: &str, permissions: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(USER_HEADER, HeaderValue::from_str(user).unwrap());
        map.insert(ORG_HEADER, HeaderValue::from_str(org).unwrap());
        map.insert(
            PERMISSIONS_HEADER,
            HeaderValue::from_str(permissions).unwrap(),
        );
        map
    }

    #[test]
    fn test_principal_from_headers() {
        let principal = principal_from_headers(&headers(
            "user-7",
            "org-3",
            "executions:trigger, executions:read",
        ))
        .unwrap();

        assert_eq!(principal.user_id, "user-7");
        assert_eq!(principal.organization_id, "org-3");
        assert!(principal.has_permission(PERM_TRIGGER));
        assert!(principal.has_permission(PERM_READ));
    }

    #[test]
    fn test_missing_user_is_unauthenticated() {
        let mut map = HeaderMap::new();
        map.insert(ORG_HEADER, HeaderValue::from_static("org-1"));

        assert!(matches!(
            principal_from_headers(&map),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_empty_permissions_allowed_but_forbidden() {
        let mut map = HeaderMap::new();
        map.insert(USER_HEADER, HeaderValue::from_static("user-1"));
        map.insert(ORG_HEADER, HeaderValue::from_static("org-1"));

        let principal = principal_from_headers(&map).unwrap();
        assert!(principal.permissions.is_empty());
        assert!(matches!(
            require_permission(&principal, PERM_READ),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn test_permission_check_case_sensitive() {
        let principal =
            principal_from_headers(&headers("user-1", "org-1", "Executions:Trigger")).unwrap();
        assert!(matches!(
            require_permission(&principal, PERM_TRIGGER),
            Err(AuthError::Forbidden(_))
        ));
    }
}
