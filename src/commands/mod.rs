//! Command implementations for the standalone CLI

pub mod bundle;
pub mod completions;
pub mod version;
