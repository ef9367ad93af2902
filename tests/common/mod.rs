//! Common test infrastructure
//!
//! This module provides the throwaway phrase databases and audio trees the
//! end-to-end tests run against. Tests should only import from this module,
//! not from internal submodules.

// Each test binary compiles its own copy of this module and none of them
// uses every helper.
#![allow(dead_code)]

mod constants;
mod fixtures;

// Public API - this is what tests import
pub use constants::*;
pub use fixtures::PhrasebankFixture;
