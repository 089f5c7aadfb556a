//! Survey statistics engine.
//!
//! Normalization turns stored answers into [`normalize::AnswerValue`]s, the aggregator
//! summarizes them per question, and [`survey_stats`] assembles the report
//! for a whole survey.

pub mod aggregator;
pub mod normalize;
pub mod survey_stats;

pub use normalize::display_value;
pub use survey_stats::{survey_stats, StatsOptions};
