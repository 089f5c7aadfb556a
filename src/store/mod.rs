//! Storage collaborators.
//!
//! The statistics engine only reads through [`SurveyStore`]. Two backends
//! implement it: a SQLite database and an in-memory store loaded from a
//! JSON snapshot.

pub mod memory;
pub mod snapshot;
pub mod sqlite;

pub use memory::MemoryStore;
pub use snapshot::Snapshot;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::models::{Question, Survey, SurveyResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("corrupt row in {table}: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Read access to surveys, responses and answers.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    /// Number of response records submitted against the survey.
    async fn count_responses(&self, survey_id: &str) -> Result<u64, StoreError>;

    /// Questions of the survey, ascending by `order_index`.
    async fn list_questions(&self, survey_id: &str) -> Result<Vec<Question>, StoreError>;

    /// Raw answers to a question, restricted to responses of the given survey.
    async fn list_answers_for_question(
        &self,
        question_id: &str,
        survey_id: &str,
    ) -> Result<Vec<Value>, StoreError>;

    async fn find_survey(&self, survey_id: &str) -> Result<Option<Survey>, StoreError>;

    /// All surveys, newest first.
    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError>;

    /// Responses to a survey, newest first, answers in question order.
    async fn list_responses(&self, survey_id: &str) -> Result<Vec<SurveyResponse>, StoreError>;
}

/// Open the backend selected by the storage configuration.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn SurveyStore>, StoreError> {
    let path = PathBuf::from(&config.path);

    match config.backend {
        StorageBackend::Sqlite => {
            info!("Opening SQLite database: {}", path.display());
            let store =
                SqliteStore::open(&path, Duration::from_millis(config.busy_timeout_ms))?;
            Ok(Box::new(store))
        }
        StorageBackend::Snapshot => {
            info!("Loading snapshot: {}", path.display());
            Ok(Box::new(MemoryStore::load(&path)?))
        }
    }
}
