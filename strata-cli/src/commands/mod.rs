//! CLI command implementations.

pub mod migrate;
pub mod version;
