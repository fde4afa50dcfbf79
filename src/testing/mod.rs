//! Testing utilities and mock implementations
//!
//! This module provides a scripted broker stub so the publisher can be
//! exercised without a running Redis server.

pub mod mocks;

pub use mocks::*;
