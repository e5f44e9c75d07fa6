//! Canonical fixtures shared across the workspace's tests

use canary_core::StepDefinition;
use canary_storage::OrgId;
use uuid::Uuid;

/// Generate a unique org ID for test isolation
pub fn unique_org() -> OrgId {
    OrgId::new(format!("test_{}", Uuid::new_v4()))
}

/// A login flow where every step passes against [`crate::mocks::MockDriver`]
pub fn login_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("navigate").with_target("https://app.example.com/login"),
        StepDefinition::new("type")
            .with_target("#email")
            .with_value("user@example.com"),
        StepDefinition::new("type")
            .with_target("#password")
            .with_value("hunter2"),
        StepDefinition::new("click").with_target("#submit"),
        StepDefinition::new("assert").with_target("#dashboard"),
    ]
}

/// Steps whose third entry fails on a driver scripted to fail `#flaky`
pub fn fail_at_third_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("navigate").with_target("https://app.example.com"),
        StepDefinition::new("click").with_target("#open"),
        StepDefinition::new("assert").with_target("#flaky"),
        StepDefinition::new("click").with_target("#never-reached"),
    ]
}

/// Steps containing an action tag outside the closed action set
pub fn unknown_action_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("navigate").with_target("https://app.example.com"),
        StepDefinition::new("double-click").with_target("#item"),
    ]
}

/// API-only steps that run without a browser session
pub fn api_only_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("api-call").with_target("https://api.example.com/health"),
        StepDefinition::new("api-call").with_target("https://api.example.com/version"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_steps_resolve() {
        for step in login_steps().iter().chain(api_only_steps().iter()) {
            assert!(step.resolve_action().is_ok(), "{} should parse", step.action);
        }
    }

    #[test]
    fn test_unknown_fixture_has_bad_action() {
        let steps = unknown_action_steps();
        assert!(steps[0].resolve_action().is_ok());
        assert!(steps[1].resolve_action().is_err());
    }

    #[test]
    fn test_unique_orgs_differ() {
        assert_ne!(unique_org().as_str(), unique_org().as_str());
    }
}
