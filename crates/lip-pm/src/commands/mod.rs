//! Package manager commands
//!
//! Implements the commands built on top of the fetch core.

pub mod fetch;

pub use fetch::{fetch_teeth, FetchCommandError, FetchSummary, ToothSpecifier};
