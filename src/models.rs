//! Data models for survey statistics.
//!
//! This module contains the records read from storage (surveys, questions,
//! responses, answers), the aggregated statistics produced from them, and
//! the camelCase shapes the web frontend consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declared type of a survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    /// Free text, never bucketed
    Text,
    /// One option out of a fixed list
    SingleChoice,
    /// Any number of options out of a fixed list
    MultipleChoice,
    /// Numeric rating, averaged
    Rating,
    /// Yes / no
    YesNo,
}

impl QuestionType {
    /// Returns the stored/wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::Rating => "rating",
            QuestionType::YesNo => "yes-no",
        }
    }

    /// Whether answers to this type are counted per option label.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::YesNo
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(QuestionType::Text),
            "single-choice" => Ok(QuestionType::SingleChoice),
            "multiple-choice" => Ok(QuestionType::MultipleChoice),
            "rating" => Ok(QuestionType::Rating),
            "yes-no" => Ok(QuestionType::YesNo),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

/// A question belonging to a survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub survey_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Display text of the question.
    pub question: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<i64>,
    /// Presentation and iteration order within the survey.
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

/// A survey together with its questions (ordered by `order_index`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

/// One stored answer, as recorded at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub response_id: String,
    pub question_id: String,
    /// Raw stored value: a string, a number, an array, or JSON-encoded text.
    pub answer: Value,
    pub created_at: DateTime<Utc>,
}

/// One respondent's submission against a survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_age: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

/// Aggregated summary of all answers to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStat {
    pub question_id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Answer label -> occurrence count.
    pub responses: BTreeMap<String, u64>,
    /// Present only for rating questions with at least one answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

impl QuestionStat {
    /// Creates a stat with no counted answers.
    pub fn empty(question: &Question) -> Self {
        Self {
            question_id: question.id.clone(),
            question: question.question.clone(),
            question_type: question.question_type,
            responses: BTreeMap::new(),
            average_rating: None,
        }
    }

    /// Sum of all bucket counts.
    pub fn counted(&self) -> u64 {
        self.responses.values().sum()
    }
}

/// Statistics for a whole survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyStats {
    pub survey_id: String,
    /// Number of response records, independent of per-question answer counts.
    pub total_responses: u64,
    pub question_stats: Vec<QuestionStat>,
}

/// Frontend shape of [`SurveyStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSurveyStats {
    pub survey_id: String,
    pub total_responses: u64,
    pub question_stats: Vec<ApiQuestionStat>,
}

/// Frontend shape of [`QuestionStat`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuestionStat {
    pub question_id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub responses: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

impl From<&SurveyStats> for ApiSurveyStats {
    fn from(stats: &SurveyStats) -> Self {
        Self {
            survey_id: stats.survey_id.clone(),
            total_responses: stats.total_responses,
            question_stats: stats
                .question_stats
                .iter()
                .map(|qs| ApiQuestionStat {
                    question_id: qs.question_id.clone(),
                    question: qs.question.clone(),
                    question_type: qs.question_type,
                    responses: qs.responses.clone(),
                    average_rating: qs.average_rating,
                })
                .collect(),
        }
    }
}

/// Metadata about a statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Storage backend the data came from.
    pub backend: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Time spent computing the statistics, in seconds.
    pub duration_seconds: f64,
}

/// A complete statistics report for one survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub metadata: ReportMetadata,
    /// The survey record, when it exists.
    pub survey: Option<Survey>,
    pub stats: SurveyStats,
}

/// Frontend shape of a survey.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSurvey {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<ApiQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<i64>,
}

impl From<&Survey> for ApiSurvey {
    fn from(survey: &Survey) -> Self {
        Self {
            id: survey.id.clone(),
            title: survey.title.clone(),
            description: survey.description.clone(),
            questions: survey
                .questions
                .iter()
                .map(|q| ApiQuestion {
                    id: q.id.clone(),
                    question_type: q.question_type,
                    question: q.question.clone(),
                    required: q.required,
                    options: q.options.clone(),
                    min_rating: q.min_rating,
                    max_rating: q.max_rating,
                })
                .collect(),
            created_at: survey.created_at,
            updated_at: survey.updated_at,
            user_id: survey.user_id.clone(),
            author_id: survey.author_id.clone(),
            author_name: survey.author_name.clone(),
            is_published: survey.is_published,
        }
    }
}

/// Frontend shape of a survey response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub id: String,
    pub survey_id: String,
    pub answers: Vec<ApiAnswer>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_age: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAnswer {
    pub question_id: String,
    pub answer: Value,
}

impl From<&SurveyResponse> for ApiResponse {
    fn from(response: &SurveyResponse) -> Self {
        Self {
            id: response.id.clone(),
            survey_id: response.survey_id.clone(),
            answers: response
                .answers
                .iter()
                .map(|a| ApiAnswer {
                    question_id: a.question_id.clone(),
                    answer: crate::stats::display_value(&a.answer),
                })
                .collect(),
            submitted_at: response.submitted_at,
            respondent_name: response.respondent_name.clone(),
            respondent_email: response.respondent_email.clone(),
            respondent_age: response.respondent_age,
        }
    }
}
