//! Common test utilities for installer integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
