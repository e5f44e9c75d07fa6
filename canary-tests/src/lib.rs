//! # Canary Tests
//!
//! Shared scaffolding for testing the Canary workspace: fluent builders
//! for records and requests, canonical fixtures, mock collaborators and
//! assertion helpers. Used by the workspace's integration tests; never
//! shipped.

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mocks;
