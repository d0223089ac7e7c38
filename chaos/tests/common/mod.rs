//! Common test utilities and infrastructure
//!
//! Shared fixtures, fakes and builders used across the chaos test suites.

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{FakeFleet, FleetOp, HarnessBuilder, InMemoryContainerRuntime, TestHarness, TestHelpers};
