//! SQLite-backed survey store.
//!
//! Every query runs on the blocking pool against a single shared
//! connection. Answers are kept as JSON text and decoded on read.

use super::{Snapshot, StoreError, SurveyStore};
use crate::models::{Answer, Question, QuestionType, Survey, SurveyResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS surveys (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    user_id TEXT,
    author_id TEXT,
    author_name TEXT,
    is_published INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    survey_id TEXT NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK (type IN ('text', 'multiple-choice', 'single-choice', 'rating', 'yes-no')),
    question TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    options TEXT,
    min_rating INTEGER,
    max_rating INTEGER,
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS survey_responses (
    id TEXT PRIMARY KEY,
    survey_id TEXT NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
    user_id TEXT,
    respondent_name TEXT,
    respondent_email TEXT,
    respondent_age INTEGER,
    submitted_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS answers (
    id TEXT PRIMARY KEY,
    response_id TEXT NOT NULL REFERENCES survey_responses(id) ON DELETE CASCADE,
    question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_questions_survey_id ON questions(survey_id);
CREATE INDEX IF NOT EXISTS idx_survey_responses_survey_id ON survey_responses(survey_id);
CREATE INDEX IF NOT EXISTS idx_answers_response_id ON answers(response_id);
CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id);
"#;

const SURVEY_COLUMNS: &str =
    "id, title, description, user_id, author_id, author_name, is_published, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, survey_id, type, question, required, options, min_rating, \
     max_rating, order_index, created_at";

/// Rows written by [`SqliteStore::import_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub surveys: usize,
    pub questions: usize,
    pub responses: usize,
    pub answers: usize,
}

/// Survey store over a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the tables exist.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }

    /// Write every survey, question, response and answer of a snapshot.
    ///
    /// Runs in one transaction: either the whole snapshot lands or nothing does.
    pub async fn import_snapshot(&self, snapshot: Snapshot) -> Result<ImportSummary, StoreError> {
        let (surveys, responses) = snapshot.into_records(Utc::now())?;

        let summary = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut summary = ImportSummary::default();

                for survey in &surveys {
                    insert_survey(&tx, survey)?;
                    summary.surveys += 1;
                    summary.questions += survey.questions.len();
                }
                for response in &responses {
                    insert_response(&tx, response)?;
                    summary.responses += 1;
                    summary.answers += response.answers.len();
                }

                tx.commit()?;
                Ok(summary)
            })
            .await?;

        info!(
            "Imported {} surveys, {} questions, {} responses, {} answers",
            summary.surveys, summary.questions, summary.responses, summary.answers
        );

        Ok(summary)
    }
}

#[async_trait]
impl SurveyStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn count_responses(&self, survey_id: &str) -> Result<u64, StoreError> {
        let survey_id = survey_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM survey_responses WHERE survey_id = ?1",
                params![survey_id],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn list_questions(&self, survey_id: &str) -> Result<Vec<Question>, StoreError> {
        let survey_id = survey_id.to_string();
        self.with_conn(move |conn| select_questions(conn, &survey_id))
            .await
    }

    async fn list_answers_for_question(
        &self,
        question_id: &str,
        survey_id: &str,
    ) -> Result<Vec<Value>, StoreError> {
        let question_id = question_id.to_string();
        let survey_id = survey_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT a.answer FROM answers a \
                 JOIN survey_responses sr ON a.response_id = sr.id \
                 WHERE a.question_id = ?1 AND sr.survey_id = ?2 \
                 ORDER BY a.rowid",
            )?;
            let rows = stmt.query_map(params![question_id, survey_id], |row| {
                row.get::<_, String>(0)
            })?;

            let mut answers = Vec::new();
            for text in rows {
                answers.push(decode_stored_answer(text?));
            }

            debug!(
                "Fetched {} answers for question {} in survey {}",
                answers.len(),
                question_id,
                survey_id
            );
            Ok(answers)
        })
        .await
    }

    async fn find_survey(&self, survey_id: &str) -> Result<Option<Survey>, StoreError> {
        let survey_id = survey_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {} FROM surveys WHERE id = ?1", SURVEY_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map(params![survey_id], survey_from_row)?;

            match rows.next() {
                Some(survey) => {
                    let mut survey = survey?;
                    survey.questions = select_questions(conn, &survey.id)?;
                    Ok(Some(survey))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM surveys ORDER BY created_at DESC",
                SURVEY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let surveys = stmt
                .query_map([], survey_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut out = Vec::with_capacity(surveys.len());
            for mut survey in surveys {
                survey.questions = select_questions(conn, &survey.id)?;
                out.push(survey);
            }
            Ok(out)
        })
        .await
    }

    async fn list_responses(&self, survey_id: &str) -> Result<Vec<SurveyResponse>, StoreError> {
        let survey_id = survey_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, survey_id, user_id, respondent_name, respondent_email, \
                 respondent_age, submitted_at \
                 FROM survey_responses WHERE survey_id = ?1 \
                 ORDER BY submitted_at DESC",
            )?;
            let responses = stmt
                .query_map(params![survey_id], |row| {
                    Ok(SurveyResponse {
                        id: row.get(0)?,
                        survey_id: row.get(1)?,
                        user_id: row.get(2)?,
                        respondent_name: row.get(3)?,
                        respondent_email: row.get(4)?,
                        respondent_age: row.get(5)?,
                        submitted_at: row.get(6)?,
                        answers: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut answer_stmt = conn.prepare_cached(
                "SELECT a.id, a.response_id, a.question_id, a.answer, a.created_at \
                 FROM answers a LEFT JOIN questions q ON a.question_id = q.id \
                 WHERE a.response_id = ?1 \
                 ORDER BY q.order_index, a.rowid",
            )?;

            let mut out = Vec::with_capacity(responses.len());
            for mut response in responses {
                let rows = answer_stmt.query_map(params![response.id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, DateTime<Utc>>(4)?,
                    ))
                })?;

                for row in rows {
                    let (id, response_id, question_id, text, created_at) = row?;
                    response.answers.push(Answer {
                        id,
                        response_id,
                        question_id,
                        answer: decode_stored_answer(text),
                        created_at,
                    });
                }
                out.push(response);
            }
            Ok(out)
        })
        .await
    }
}

/// Stored answers are JSON text; rows written outside this tool may hold
/// bare text, which is returned as a JSON string.
fn decode_stored_answer(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Question options are a JSON list; a bare string becomes a one-element list.
fn decode_options(text: Option<String>) -> Option<Vec<String>> {
    text.map(|t| serde_json::from_str::<Vec<String>>(&t).unwrap_or_else(|_| vec![t]))
}

fn survey_from_row(row: &Row<'_>) -> rusqlite::Result<Survey> {
    Ok(Survey {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        user_id: row.get(3)?,
        author_id: row.get(4)?,
        author_name: row.get(5)?,
        is_published: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        questions: Vec::new(),
    })
}

fn select_questions(conn: &Connection, survey_id: &str) -> Result<Vec<Question>, StoreError> {
    let sql = format!(
        "SELECT {} FROM questions WHERE survey_id = ?1 ORDER BY order_index, rowid",
        QUESTION_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![survey_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, bool>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<i64>>(6)?,
            row.get::<_, Option<i64>>(7)?,
            row.get::<_, i64>(8)?,
            row.get::<_, DateTime<Utc>>(9)?,
        ))
    })?;

    let mut questions = Vec::new();
    for row in rows {
        let (id, survey_id, kind, question, required, options, min_rating, max_rating, order_index, created_at) =
            row?;

        let question_type = kind
            .parse::<QuestionType>()
            .map_err(|message| StoreError::Decode {
                table: "questions",
                message,
            })?;

        questions.push(Question {
            id,
            survey_id,
            question_type,
            question,
            required,
            options: decode_options(options),
            min_rating,
            max_rating,
            order_index,
            created_at,
        });
    }

    Ok(questions)
}

fn insert_survey(conn: &Connection, survey: &Survey) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO surveys (id, title, description, user_id, author_id, author_name, \
         is_published, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            survey.id,
            survey.title,
            survey.description,
            survey.user_id,
            survey.author_id,
            survey.author_name,
            survey.is_published,
            survey.created_at,
            survey.updated_at,
        ],
    )?;

    for q in &survey.questions {
        let options = q
            .options
            .as_ref()
            .map(|o| Value::from(o.clone()).to_string());

        conn.execute(
            "INSERT INTO questions (id, survey_id, type, question, required, options, \
             min_rating, max_rating, order_index, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                q.id,
                q.survey_id,
                q.question_type.as_str(),
                q.question,
                q.required,
                options,
                q.min_rating,
                q.max_rating,
                q.order_index,
                q.created_at,
            ],
        )?;
    }

    Ok(())
}

fn insert_response(conn: &Connection, response: &SurveyResponse) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO survey_responses (id, survey_id, user_id, respondent_name, \
         respondent_email, respondent_age, submitted_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            response.id,
            response.survey_id,
            response.user_id,
            response.respondent_name,
            response.respondent_email,
            response.respondent_age,
            response.submitted_at,
        ],
    )?;

    for a in &response.answers {
        conn.execute(
            "INSERT INTO answers (id, response_id, question_id, answer, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                a.id,
                a.response_id,
                a.question_id,
                a.answer.to_string(),
                a.created_at
            ],
        )?;
    }

    Ok(())
}
