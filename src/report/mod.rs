//! Report generation.
//!
//! Renders survey statistics, survey listings and response listings as
//! Markdown or as the JSON shapes the web frontend consumes.

pub mod generator;

pub use generator::*;
