//! CLI command implementations.

pub mod circuit;
pub mod common;
pub mod program;
pub mod version;
