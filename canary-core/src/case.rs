//! Test case and suite definitions

use crate::action::StepDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Target environment an execution was triggered against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Environment {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self, crate::Error> {
        match s {
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            _ => Err(crate::Error::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Free-form triggering context attached to an execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Who or what triggered the execution (user id, schedule name, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    /// Environment the execution ran against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// A test case is an ordered sequence of step definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique identifier
    pub id: Uuid,

    /// Project the case belongs to
    pub project_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Description of what the case verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered steps; position is the step index
    pub steps: Vec<StepDefinition>,
}

impl TestCase {
    /// Create a new empty test case
    pub fn new(project_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Append a step to the case
    pub fn add_step(&mut self, step: StepDefinition) {
        self.steps.push(step);
    }

    pub fn with_steps(mut self, steps: Vec<StepDefinition>) -> Self {
        self.steps = steps;
        self
    }
}

/// A suite groups test cases that are triggered together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Unique identifier
    pub id: Uuid,

    /// Project the suite belongs to
    pub project_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Members of the suite
    pub case_ids: Vec<Uuid>,
}

impl TestSuite {
    pub fn new(project_id: Uuid, name: impl Into<String>, case_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            case_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_creation() {
        let project = Uuid::new_v4();
        let mut case = TestCase::new(project, "login flow");
        assert!(case.steps.is_empty());

        case.add_step(StepDefinition::new("navigate").with_target("https://example.com"));
        case.add_step(StepDefinition::new("click").with_target("#login"));

        assert_eq!(case.steps.len(), 2);
        assert_eq!(case.project_id, project);
    }

    #[test]
    fn test_environment_round_trip() {
        for env in [
            Environment::Test,
            Environment::Staging,
            Environment::Production,
        ] {
            assert_eq!(Environment::try_from(env.as_str()).unwrap(), env);
        }
    }

    #[test]
    fn test_unknown_environment_rejected() {
        assert!(Environment::try_from("qa").is_err());
    }

    #[test]
    fn test_metadata_defaults() {
        let metadata: ExecutionMetadata = serde_json::from_str("{}").unwrap();
        assert!(metadata.triggered_by.is_none());
        assert!(metadata.environment.is_none());
    }
}
