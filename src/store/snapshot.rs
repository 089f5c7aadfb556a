//! JSON snapshot of surveys and responses.
//!
//! The snapshot uses the frontend's camelCase shape so exports from the web
//! app can be loaded directly.

use super::StoreError;
use crate::models::{Answer, Question, QuestionType, Survey, SurveyResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub surveys: Vec<SnapshotSurvey>,
    #[serde(default)]
    pub responses: Vec<SnapshotResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSurvey {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<SnapshotQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub min_rating: Option<i64>,
    #[serde(default)]
    pub max_rating: Option<i64>,
    /// Defaults to the question's position in the list.
    #[serde(default)]
    pub order_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub id: String,
    pub survey_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub respondent_name: Option<String>,
    #[serde(default)]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub respondent_age: Option<i64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: Vec<SnapshotAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAnswer {
    #[serde(default)]
    pub id: Option<String>,
    pub question_id: String,
    pub answer: Value,
}

fn default_true() -> bool {
    true
}

impl Snapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        serde_json::from_str(content).map_err(|e| StoreError::Snapshot(e.to_string()))
    }

    /// Check references and convert into storage records.
    ///
    /// Missing timestamps are filled with `now`.
    pub fn into_records(
        self,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Survey>, Vec<SurveyResponse>), StoreError> {
        let mut survey_ids = HashSet::new();
        let mut question_ids = HashSet::new();
        let mut surveys = Vec::with_capacity(self.surveys.len());

        for survey in self.surveys {
            if !survey_ids.insert(survey.id.clone()) {
                return Err(StoreError::Snapshot(format!(
                    "duplicate survey id: {}",
                    survey.id
                )));
            }

            let created_at = survey.created_at.unwrap_or(now);
            let mut questions = Vec::with_capacity(survey.questions.len());

            for (position, q) in survey.questions.into_iter().enumerate() {
                if !question_ids.insert(q.id.clone()) {
                    return Err(StoreError::Snapshot(format!(
                        "duplicate question id: {}",
                        q.id
                    )));
                }

                questions.push(Question {
                    id: q.id,
                    survey_id: survey.id.clone(),
                    question_type: q.question_type,
                    question: q.question,
                    required: q.required,
                    options: q.options,
                    min_rating: q.min_rating,
                    max_rating: q.max_rating,
                    order_index: q.order_index.unwrap_or(position as i64),
                    created_at,
                });
            }

            questions.sort_by_key(|q| q.order_index);

            surveys.push(Survey {
                id: survey.id,
                title: survey.title,
                description: survey.description,
                user_id: survey.user_id,
                author_id: survey.author_id,
                author_name: survey.author_name,
                is_published: survey.is_published,
                created_at,
                updated_at: survey.updated_at.unwrap_or(created_at),
                questions,
            });
        }

        let mut response_ids = HashSet::new();
        let mut responses = Vec::with_capacity(self.responses.len());

        for response in self.responses {
            if !survey_ids.contains(&response.survey_id) {
                return Err(StoreError::Snapshot(format!(
                    "response {} references unknown survey {}",
                    response.id, response.survey_id
                )));
            }
            if !response_ids.insert(response.id.clone()) {
                return Err(StoreError::Snapshot(format!(
                    "duplicate response id: {}",
                    response.id
                )));
            }

            let submitted_at = response.submitted_at.unwrap_or(now);
            let mut answers = Vec::with_capacity(response.answers.len());

            for (position, a) in response.answers.into_iter().enumerate() {
                if !question_ids.contains(&a.question_id) {
                    return Err(StoreError::Snapshot(format!(
                        "response {} answers unknown question {}",
                        response.id, a.question_id
                    )));
                }

                answers.push(Answer {
                    id: a
                        .id
                        .unwrap_or_else(|| format!("{}-{}", response.id, position)),
                    response_id: response.id.clone(),
                    question_id: a.question_id,
                    answer: a.answer,
                    created_at: submitted_at,
                });
            }

            responses.push(SurveyResponse {
                id: response.id,
                survey_id: response.survey_id,
                user_id: response.user_id,
                respondent_name: response.respondent_name,
                respondent_email: response.respondent_email,
                respondent_age: response.respondent_age,
                submitted_at,
                answers,
            });
        }

        Ok((surveys, responses))
    }
}
