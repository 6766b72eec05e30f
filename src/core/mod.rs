//! Core infrastructure: destination layout, the bundle, lifecycle and output.

pub mod bundle;
pub mod config;
pub mod lifecycle;
pub mod output;
