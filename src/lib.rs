//! standalone - standalone application bundler
//!
//! Traces the files a built server application reaches from its entry points,
//! copies exactly those files and installed packages into an output directory,
//! and writes a launcher script so the result runs without a package install.
//!
//! The run is a fixed sequence of stages:
//! [`graph`] loads the build manifest, [`tracer`] walks the module graph,
//! [`classifier`] decides per package between a partial and a full copy,
//! [`materializer`] plans and performs the copy, and [`launcher`] writes the
//! start script. [`pipeline`] drives them in order.

pub mod cancel;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod hash;
pub mod launcher;
pub mod materializer;
pub mod path_utils;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod temp;
pub mod tracer;
pub mod ui;

#[cfg(test)]
mod test_fixtures;
