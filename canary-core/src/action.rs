//! Test step actions
//!
//! Actions form a closed set. Step definitions arriving from outside the
//! process carry the action as a raw string so an unknown tag can still be
//! represented and reported as a configuration defect at dispatch time,
//! instead of failing wholesale at the deserialization boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the supported step actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Navigate the browser to a URL
    Navigate,

    /// Click the element identified by the target selector
    Click,

    /// Type the value into the element identified by the target selector
    Type,

    /// Wait for a selector to appear or for a fixed delay
    Wait,

    /// Assert on the state of the target element
    Assert,

    /// Call an HTTP API endpoint
    ApiCall,
}

impl Action {
    /// All supported actions, in wire order
    pub const ALL: [Action; 6] = [
        Action::Navigate,
        Action::Click,
        Action::Type,
        Action::Wait,
        Action::Assert,
        Action::ApiCall,
    ];

    /// Whether this action needs a live browser session.
    ///
    /// `api-call` is the only action that runs without one; this is a
    /// fixed list, not a per-action configuration.
    pub fn requires_browser(self) -> bool {
        !matches!(self, Action::ApiCall)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Navigate => "navigate",
            Action::Click => "click",
            Action::Type => "type",
            Action::Wait => "wait",
            Action::Assert => "assert",
            Action::ApiCall => "api-call",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(Action::Navigate),
            "click" => Ok(Action::Click),
            "type" => Ok(Action::Type),
            "wait" => Ok(Action::Wait),
            "assert" => Ok(Action::Assert),
            "api-call" => Ok(Action::ApiCall),
            _ => Err(crate::Error::UnknownAction(s.to_string())),
        }
    }
}

/// One step of a test case as supplied by the caller
///
/// The action is kept as the raw wire string until dispatch so that an
/// unknown tag produces an `error` step result naming the tag rather than
/// a deserialization failure for the whole case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Action tag (`navigate`, `click`, `type`, `wait`, `assert`, `api-call`)
    pub action: String,

    /// Selector or URL the action operates on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Input value for actions that take one (e.g. `type`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Per-step timeout override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl StepDefinition {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: None,
            value: None,
            timeout_ms: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Resolve the raw action tag into the closed action set
    pub fn resolve_action(&self) -> crate::Result<Action> {
        self.action.parse()
    }
}
