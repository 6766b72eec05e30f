//! Filesystem and subprocess helpers shared by the pipeline stages.

pub mod cmd;
pub mod fs_utils;
