//! Common test utilities shared by the integration suites
//!
//! This module provides:
//! - Test configuration and fast password hashing
//! - An in-memory application with handles on its backends
//! - A unit-of-work factory that fails on demand
//! - Request helpers

#![allow(dead_code)]

pub mod factories;
pub mod mocks;

pub use factories::*;
pub use mocks::*;
