//! SQLite backend.
//!
//! Every collection is a table holding the record as a JSON `body` next to
//! the handful of columns that searches and filters need. News visibility
//! scopes are translated to SQL, so filtering happens in the database.

use async_trait::async_trait;
use campusdesk_core::actor::UserRecord;
use campusdesk_core::catalog::{Building, Course, CourseQuery, Department, FeeCatalog, Quiz};
use campusdesk_core::error::StoreError;
use campusdesk_core::message::{Conversation, ConversationSummary, Message};
use campusdesk_core::news::{News, NewsScope, ScopeClause};
use campusdesk_core::store::{CampusStore, ConversationStore};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::APPEND_RETRIES;

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id    TEXT PRIMARY KEY,
            body  TEXT NOT NULL
        )",
    ),
    (
        "buildings",
        "CREATE TABLE IF NOT EXISTS buildings (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            active      INTEGER NOT NULL DEFAULT 1,
            body        TEXT NOT NULL
        )",
    ),
    (
        "departments",
        "CREATE TABLE IF NOT EXISTS departments (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            code        TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            hod         TEXT,
            active      INTEGER NOT NULL DEFAULT 1,
            body        TEXT NOT NULL
        )",
    ),
    (
        "courses",
        "CREATE TABLE IF NOT EXISTS courses (
            id          TEXT PRIMARY KEY,
            code        TEXT NOT NULL,
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            department  TEXT NOT NULL,
            level       INTEGER NOT NULL,
            active      INTEGER NOT NULL DEFAULT 1,
            body        TEXT NOT NULL
        )",
    ),
    (
        "news",
        "CREATE TABLE IF NOT EXISTS news (
            id          TEXT PRIMARY KEY,
            audience    TEXT NOT NULL,
            department  TEXT,
            courses     TEXT NOT NULL DEFAULT '[]',
            tags        TEXT NOT NULL DEFAULT '[]',
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            body        TEXT NOT NULL
        )",
    ),
    (
        "news index",
        "CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at DESC)",
    ),
    (
        "fee_catalogs",
        "CREATE TABLE IF NOT EXISTS fee_catalogs (
            id              TEXT PRIMARY KEY,
            effective_date  TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            active          INTEGER NOT NULL DEFAULT 1,
            body            TEXT NOT NULL
        )",
    ),
    (
        "quizzes",
        "CREATE TABLE IF NOT EXISTS quizzes (
            id      TEXT PRIMARY KEY,
            course  TEXT NOT NULL,
            title   TEXT NOT NULL,
            active  INTEGER NOT NULL DEFAULT 1,
            body    TEXT NOT NULL
        )",
    ),
    (
        "conversations",
        "CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            owner       TEXT NOT NULL,
            version     INTEGER NOT NULL,
            updated_at  TEXT NOT NULL,
            body        TEXT NOT NULL
        )",
    ),
    (
        "conversations index",
        "CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner, updated_at DESC)",
    ),
];

/// A SQLite-backed store for catalogs and conversations.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// `sqlite::memory:` gives an ephemeral database on a single connection.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite url: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each connection to `:memory:` is its own database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for (name, ddl) in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{name}: {e}")))?;
        }
        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("ping: {e}")))?;
        Ok(())
    }

    async fn fetch_bodies<'q, T: DeserializeOwned>(
        &self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        what: &str,
    ) -> Result<Vec<T>, StoreError> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{what}: {e}")))?;
        rows.iter().map(decode_body).collect()
    }

    async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT body FROM {table} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{table} by id: {e}")))?;
        row.as_ref().map(decode_body).transpose()
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed width so text ordering matches time ordering.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Storage(format!("Serialization: {e}")))
}

fn decode_body<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, StoreError> {
    let body: String = row
        .try_get("body")
        .map_err(|e| StoreError::QueryFailed(format!("body column: {e}")))?;
    serde_json::from_str(&body).map_err(|e| StoreError::QueryFailed(format!("Corrupt record: {e}")))
}

/// A `LIKE` pattern matching `term` anywhere, with wildcards escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn write_err(table: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Storage(format!("{table} upsert failed: {e}"))
}

/// Append the SQL form of one visibility clause.
fn push_clause(qb: &mut QueryBuilder<'_, Sqlite>, clause: &ScopeClause) {
    match clause {
        ScopeClause::Audience { audience } => {
            qb.push("audience = ").push_bind(audience.as_str());
        }
        ScopeClause::Department { department } => {
            qb.push("(audience = 'department_specific' AND department = ")
                .push_bind(department.clone())
                .push(")");
        }
        ScopeClause::AnyDepartment => {
            qb.push("audience = 'department_specific'");
        }
        ScopeClause::Courses { courses } if courses.is_empty() => {
            qb.push("0");
        }
        ScopeClause::Courses { courses } => {
            qb.push(
                "(audience = 'course_specific' AND EXISTS \
                 (SELECT 1 FROM json_each(news.courses) WHERE value IN (",
            );
            let mut values = qb.separated(", ");
            for course in courses {
                values.push_bind(course.clone());
            }
            qb.push(")))");
        }
        ScopeClause::AnyCourse => {
            qb.push("audience = 'course_specific'");
        }
    }
}

#[async_trait]
impl CampusStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_by_id("users", id).await
    }

    async fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, body) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
        )
        .bind(&user.id)
        .bind(encode(&user)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("users"))?;
        Ok(())
    }

    async fn search_buildings(&self, term: &str, limit: usize) -> Result<Vec<Building>, StoreError> {
        let query = sqlx::query(
            r"SELECT body FROM buildings
              WHERE active = 1 AND (name LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\')
              ORDER BY name LIMIT ?2",
        )
        .bind(like_pattern(term))
        .bind(limit as i64);
        self.fetch_bodies(query, "building search").await
    }

    async fn get_building(&self, id: &str) -> Result<Option<Building>, StoreError> {
        self.fetch_by_id("buildings", id).await
    }

    async fn upsert_building(&self, building: Building) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO buildings (id, name, description, active, body) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&building.id)
        .bind(&building.name)
        .bind(&building.description)
        .bind(building.active)
        .bind(encode(&building)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("buildings"))?;
        Ok(())
    }

    async fn search_departments(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Department>, StoreError> {
        let query = sqlx::query(
            r"SELECT body FROM departments
              WHERE active = 1
                AND (name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\')
              ORDER BY name LIMIT ?2",
        )
        .bind(like_pattern(term))
        .bind(limit as i64);
        self.fetch_bodies(query, "department search").await
    }

    async fn search_departments_by_hod(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Department>, StoreError> {
        let query = sqlx::query(
            r"SELECT body FROM departments
              WHERE active = 1 AND hod LIKE ?1 ESCAPE '\'
              ORDER BY name LIMIT ?2",
        )
        .bind(like_pattern(term))
        .bind(limit as i64);
        self.fetch_bodies(query, "hod search").await
    }

    async fn get_department(&self, id: &str) -> Result<Option<Department>, StoreError> {
        self.fetch_by_id("departments", id).await
    }

    async fn upsert_department(&self, department: Department) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO departments (id, name, code, description, hod, active, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                description = excluded.description,
                hod = excluded.hod,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(&department.description)
        .bind(&department.hod)
        .bind(department.active)
        .bind(encode(&department)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("departments"))?;
        Ok(())
    }

    async fn list_courses(&self, query: &CourseQuery, limit: usize) -> Result<Vec<Course>, StoreError> {
        let search = query.search.as_deref().map(like_pattern);
        let sql = sqlx::query(
            r"SELECT body FROM courses
              WHERE active = 1
                AND (?1 IS NULL OR code LIKE ?1 ESCAPE '\' OR title LIKE ?1 ESCAPE '\'
                     OR description LIKE ?1 ESCAPE '\')
                AND (?2 IS NULL OR department = ?2 OR EXISTS (
                        SELECT 1 FROM json_each(courses.body, '$.departmentsOffering') o
                        WHERE json_extract(o.value, '$.department') = ?2))
                AND (?3 IS NULL OR level = ?3)
              ORDER BY level, code LIMIT ?4",
        )
        .bind(search)
        .bind(query.department.clone())
        .bind(query.level.map(i64::from))
        .bind(limit as i64);
        self.fetch_bodies(sql, "course listing").await
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>, StoreError> {
        self.fetch_by_id("courses", id).await
    }

    async fn upsert_course(&self, course: Course) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO courses (id, code, title, description, department, level, active, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                code = excluded.code,
                title = excluded.title,
                description = excluded.description,
                department = excluded.department,
                level = excluded.level,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&course.id)
        .bind(&course.code)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.department)
        .bind(i64::from(course.level))
        .bind(course.active)
        .bind(encode(&course)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("courses"))?;
        Ok(())
    }

    async fn list_news(&self, scope: &NewsScope, limit: usize) -> Result<Vec<News>, StoreError> {
        if scope.clauses.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM news WHERE active = 1 AND (");
        for (i, clause) in scope.clauses.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_clause(&mut qb, clause);
        }
        qb.push(")");

        if !scope.tags.is_empty() {
            qb.push(
                " AND (json_array_length(news.tags) = 0 OR EXISTS \
                 (SELECT 1 FROM json_each(news.tags) WHERE value IN (",
            );
            let mut values = qb.separated(", ");
            for tag in &scope.tags {
                values.push_bind(tag.clone());
            }
            qb.push(")))");
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("news listing: {e}")))?;
        rows.iter().map(decode_body).collect()
    }

    async fn get_news(&self, id: &str) -> Result<Option<News>, StoreError> {
        self.fetch_by_id("news", id).await
    }

    async fn upsert_news(&self, news: News) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO news (id, audience, department, courses, tags, active, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                audience = excluded.audience,
                department = excluded.department,
                courses = excluded.courses,
                tags = excluded.tags,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&news.id)
        .bind(news.audience.as_str())
        .bind(&news.department)
        .bind(encode(&news.courses)?)
        .bind(encode(&news.tags)?)
        .bind(news.active)
        .bind(timestamp(news.created_at))
        .bind(encode(&news)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("news"))?;
        Ok(())
    }

    async fn list_fee_catalogs(&self) -> Result<Vec<FeeCatalog>, StoreError> {
        let query = sqlx::query(
            "SELECT body FROM fee_catalogs WHERE active = 1
             ORDER BY effective_date DESC, created_at DESC",
        );
        self.fetch_bodies(query, "fee catalogs").await
    }

    async fn upsert_fee_catalog(&self, catalog: FeeCatalog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO fee_catalogs (id, effective_date, created_at, active, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                effective_date = excluded.effective_date,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&catalog.id)
        .bind(catalog.effective_date.format("%Y-%m-%d").to_string())
        .bind(timestamp(catalog.created_at))
        .bind(catalog.active)
        .bind(encode(&catalog)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("fee_catalogs"))?;
        Ok(())
    }

    async fn acknowledge_fee_catalogs(&self) -> Result<usize, StoreError> {
        let result = sqlx::query(
            "UPDATE fee_catalogs SET body = json_set(body, '$.isNew', json('false'))
             WHERE json_extract(body, '$.isNew') = 1",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("acknowledge fees: {e}")))?;
        Ok(result.rows_affected() as usize)
    }

    async fn list_quizzes(&self, course: Option<&str>) -> Result<Vec<Quiz>, StoreError> {
        let query = sqlx::query(
            "SELECT body FROM quizzes WHERE active = 1 AND (?1 IS NULL OR course = ?1)
             ORDER BY title",
        )
        .bind(course.map(str::to_string));
        self.fetch_bodies(query, "quizzes").await
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        self.fetch_by_id("quizzes", id).await
    }

    async fn upsert_quiz(&self, quiz: Quiz) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quizzes (id, course, title, active, body) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                course = excluded.course,
                title = excluded.title,
                active = excluded.active,
                body = excluded.body",
        )
        .bind(&quiz.id)
        .bind(&quiz.course)
        .bind(&quiz.title)
        .bind(quiz.active)
        .bind(encode(&quiz)?)
        .execute(&self.pool)
        .await
        .map_err(write_err("quizzes"))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation, StoreError> {
        if conversation.messages.is_empty() {
            return Err(StoreError::Storage(
                "Conversation must hold at least one message".into(),
            ));
        }
        let mut conversation = conversation;
        conversation.version = 1;

        sqlx::query(
            "INSERT INTO conversations (id, owner, version, updated_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(conversation.id.as_str())
        .bind(&conversation.owner)
        .bind(conversation.version as i64)
        .bind(timestamp(conversation.updated_at))
        .bind(encode(&conversation)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Conflict(format!("conversation {}: {e}", conversation.id)))?;

        debug!(id = %conversation.id, owner = %conversation.owner, "Created conversation");
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        self.fetch_by_id("conversations", id).await
    }

    async fn append_messages(&self, id: &str, messages: Vec<Message>) -> Result<Conversation, StoreError> {
        for attempt in 1..=APPEND_RETRIES {
            let row = sqlx::query("SELECT version, body FROM conversations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("conversation read: {e}")))?
                .ok_or_else(|| StoreError::NotFound(format!("Conversation {id}")))?;

            let version: i64 = row
                .try_get("version")
                .map_err(|e| StoreError::QueryFailed(format!("version column: {e}")))?;
            let mut conversation: Conversation = decode_body(&row)?;
            for message in messages.iter().cloned() {
                conversation.push(message);
            }
            conversation.updated_at = Utc::now();
            conversation.version = version as u64 + 1;

            let result = sqlx::query(
                "UPDATE conversations SET version = ?1, updated_at = ?2, body = ?3
                 WHERE id = ?4 AND version = ?5",
            )
            .bind(conversation.version as i64)
            .bind(timestamp(conversation.updated_at))
            .bind(encode(&conversation)?)
            .bind(id)
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("conversation append: {e}")))?;

            if result.rows_affected() == 1 {
                return Ok(conversation);
            }
            debug!(id, attempt, "Conversation changed underneath append, retrying");
            tokio::task::yield_now().await;
        }

        warn!(id, "Giving up on conversation append after {APPEND_RETRIES} attempts");
        Err(StoreError::Conflict(format!("conversation {id}")))
    }

    async fn list_conversations(&self, owner: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let query = sqlx::query(
            "SELECT body FROM conversations WHERE owner = ?1 ORDER BY updated_at DESC",
        )
        .bind(owner.to_string());
        let conversations: Vec<Conversation> = self.fetch_bodies(query, "conversations").await?;
        Ok(conversations.iter().map(Conversation::summary).collect())
    }
}
