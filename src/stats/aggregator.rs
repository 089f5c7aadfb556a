//! Per-question aggregation.
//!
//! Turns the normalized answers collected for one question into a
//! [`QuestionStat`], with a policy chosen by the question's type.

use super::normalize::{number_label, AnswerValue};
use crate::models::{Question, QuestionStat, QuestionType};
use std::collections::BTreeMap;

/// Aggregate all answers recorded for a question.
///
/// `None` entries are answers stored as null: they make the list non-empty
/// but never land in a bucket.
pub fn aggregate_question(question: &Question, answers: &[Option<AnswerValue>]) -> QuestionStat {
    let mut stat = QuestionStat::empty(question);

    if answers.is_empty() {
        return stat;
    }

    match question.question_type {
        QuestionType::Rating => {
            let ratings = numeric_ratings(answers);
            stat.average_rating = Some(mean(&ratings));
            stat.responses = rating_counts(&ratings);
        }
        kind if kind.is_choice() => {
            stat.responses = option_counts(answers);
        }
        _ => {}
    }

    stat
}

/// Values that convert to a finite number. Everything else is dropped.
pub fn numeric_ratings(answers: &[Option<AnswerValue>]) -> Vec<f64> {
    answers
        .iter()
        .flatten()
        .filter_map(|answer| match answer {
            AnswerValue::Numeric(n) => Some(*n),
            AnswerValue::Scalar(text) => parse_rating(text),
            AnswerValue::Sequence(_) => None,
        })
        .filter(|n| n.is_finite())
        .collect()
}

/// Arithmetic mean; 0 for an empty list.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Count ratings by their canonical string form, so `4` and `"4"` share a key.
pub fn rating_counts(ratings: &[f64]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for rating in ratings {
        *counts.entry(number_label(*rating)).or_default() += 1;
    }

    counts
}

/// Count option labels. Sequences count every element (multi-select).
pub fn option_counts(answers: &[Option<AnswerValue>]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for answer in answers.iter().flatten() {
        match answer {
            AnswerValue::Sequence(options) => {
                for option in options.iter().filter(|o| !o.is_empty()) {
                    *counts.entry(option.clone()).or_default() += 1;
                }
            }
            scalar => {
                if let Some(label) = scalar.label().filter(|l| !l.is_empty()) {
                    *counts.entry(label).or_default() += 1;
                }
            }
        }
    }

    counts
}

/// Blank text reads as 0, the way a browser form coerces it.
fn parse_rating(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok()
}
