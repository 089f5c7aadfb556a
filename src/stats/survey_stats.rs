//! Survey-level statistics orchestration.

use super::aggregator::aggregate_question;
use super::normalize::normalize_all;
use crate::config::StatsConfig;
use crate::models::SurveyStats;
use crate::store::{StoreError, SurveyStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

/// Options for a statistics run.
#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Answer fetches allowed in flight at once (1 = sequential).
    pub concurrency: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl From<&StatsConfig> for StatsOptions {
    fn from(config: &StatsConfig) -> Self {
        Self {
            concurrency: config.concurrency,
        }
    }
}

/// Compute statistics for every question of a survey.
///
/// The survey is not required to exist: an unknown id yields no question
/// stats and whatever response count is on record. Any storage failure
/// aborts the whole computation.
pub async fn survey_stats<S>(
    store: &S,
    survey_id: &str,
    options: &StatsOptions,
) -> Result<SurveyStats, StoreError>
where
    S: SurveyStore + ?Sized,
{
    let total_responses = store.count_responses(survey_id).await?;

    let mut questions = store.list_questions(survey_id).await?;
    questions.sort_by_key(|q| q.order_index);

    debug!(
        "Survey {}: {} responses, {} questions ({} backend)",
        survey_id,
        total_responses,
        questions.len(),
        store.backend_tag()
    );

    // `buffered` yields results in input order, so question order survives
    // concurrent fetches.
    let question_stats = stream::iter(questions.iter())
        .map(|question| async move {
            let raw = store
                .list_answers_for_question(&question.id, survey_id)
                .await?;
            let answers = normalize_all(&raw);
            debug!(
                "Question {} ({}): {} answers",
                question.id,
                question.question_type,
                answers.len()
            );
            Ok::<_, StoreError>(aggregate_question(question, &answers))
        })
        .buffered(options.concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await?;

    Ok(SurveyStats {
        survey_id: survey_id.to_string(),
        total_responses,
        question_stats,
    })
}
