//! # Syncer Testing Utils
//!
//! Shared testing utilities for the syncer workspace: in-memory collaborator
//! mocks and builders for source-system records.
//!
//! ```toml
//! [dev-dependencies]
//! syncer-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
