//! In-memory store backed by a loaded snapshot.

use super::{Snapshot, StoreError, SurveyStore};
use crate::models::{Question, Survey, SurveyResponse};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Read-only store holding every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    surveys: Vec<Survey>,
    responses: Vec<SurveyResponse>,
}

impl MemoryStore {
    pub fn new(surveys: Vec<Survey>, responses: Vec<SurveyResponse>) -> Self {
        Self { surveys, responses }
    }

    /// Build a store from a snapshot, validating its references.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let (surveys, responses) = snapshot.into_records(Utc::now())?;
        debug!(
            "Loaded {} surveys and {} responses into memory",
            surveys.len(),
            responses.len()
        );
        Ok(Self::new(surveys, responses))
    }

    /// Load a snapshot file into a new store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Self::from_snapshot(Snapshot::load(path)?)
    }

    fn survey(&self, survey_id: &str) -> Option<&Survey> {
        self.surveys.iter().find(|s| s.id == survey_id)
    }

    /// order_index of every known question, across all surveys.
    fn question_order(&self) -> HashMap<&str, i64> {
        self.surveys
            .iter()
            .flat_map(|s| &s.questions)
            .map(|q| (q.id.as_str(), q.order_index))
            .collect()
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn count_responses(&self, survey_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .count() as u64)
    }

    async fn list_questions(&self, survey_id: &str) -> Result<Vec<Question>, StoreError> {
        let mut questions = self
            .survey(survey_id)
            .map(|s| s.questions.clone())
            .unwrap_or_default();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn list_answers_for_question(
        &self,
        question_id: &str,
        survey_id: &str,
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .flat_map(|r| &r.answers)
            .filter(|a| a.question_id == question_id)
            .map(|a| a.answer.clone())
            .collect())
    }

    async fn find_survey(&self, survey_id: &str) -> Result<Option<Survey>, StoreError> {
        Ok(self.survey(survey_id).cloned())
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        let mut surveys = self.surveys.clone();
        surveys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(surveys)
    }

    async fn list_responses(&self, survey_id: &str) -> Result<Vec<SurveyResponse>, StoreError> {
        let order = self.question_order();

        let mut responses: Vec<SurveyResponse> = self
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect();

        responses.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        for response in &mut responses {
            response
                .answers
                .sort_by_key(|a| order.get(a.question_id.as_str()).copied().unwrap_or(i64::MAX));
        }

        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::snapshot::tests::SAMPLE;
    use serde_json::json;

    fn sample_store() -> MemoryStore {
        MemoryStore::from_snapshot(Snapshot::from_json(SAMPLE).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_count_responses() {
        let store = sample_store();
        assert_eq!(store.count_responses("s-feedback").await.unwrap(), 4);
        assert_eq!(store.count_responses("s-other").await.unwrap(), 1);
        assert_eq!(store.count_responses("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_questions_in_order() {
        let store = sample_store();
        let ids: Vec<String> = store
            .list_questions("s-feedback")
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();

        assert_eq!(
            ids,
            vec!["q-rating", "q-color", "q-features", "q-recommend", "q-comments", "q-skip"]
        );
        assert!(store.list_questions("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answers_scoped_to_survey() {
        let store = sample_store();

        // r5 belongs to s-other but answers q-rating; it must not leak in.
        let answers = store
            .list_answers_for_question("q-rating", "s-feedback")
            .await
            .unwrap();
        assert_eq!(answers, vec![json!(3), json!("4"), json!("bad"), json!(5)]);

        let foreign = store
            .list_answers_for_question("q-rating", "s-other")
            .await
            .unwrap();
        assert_eq!(foreign, vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_list_surveys_newest_first() {
        let store = sample_store();
        let ids: Vec<String> = store
            .list_surveys()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s-other", "s-feedback"]);
    }

    #[tokio::test]
    async fn test_list_responses() {
        let store = sample_store();
        let responses = store.list_responses("s-feedback").await.unwrap();

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0].id, "r4");
        assert_eq!(responses[3].id, "r1");

        let first_answers: Vec<&str> = responses[3]
            .answers
            .iter()
            .map(|a| a.question_id.as_str())
            .collect();
        assert_eq!(
            first_answers,
            vec!["q-rating", "q-color", "q-features", "q-recommend", "q-comments"]
        );
    }

    #[test]
    fn test_find_survey_blocking() {
        let store = sample_store();
        let found = tokio_test::block_on(store.find_survey("s-other")).unwrap();
        assert_eq!(found.map(|s| s.title), Some("Office Poll".to_string()));
        assert!(tokio_test::block_on(store.find_survey("nope"))
            .unwrap()
            .is_none());
    }
}
