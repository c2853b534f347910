//! Terminal presentation of run results
//!
//! Progress during the copy phase lives in [`crate::progress`]; this module
//! prints what a finished run did.

pub mod display;

pub use display::{display_plan, display_summary};
