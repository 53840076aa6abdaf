//! Persistence traits for the identity directory, the content catalogs, and
//! chat conversations.
//!
//! Implementations: SQLite (production), in-memory (tests and demos).
//! Every write is a single-record upsert; there are no multi-record
//! transactions.

use async_trait::async_trait;
use crate::actor::UserRecord;
use crate::catalog::{Building, Course, CourseQuery, Department, FeeCatalog, Quiz};
use crate::error::StoreError;
use crate::message::{Conversation, ConversationSummary, Message};
use crate::news::{News, NewsScope};

type Result<T> = std::result::Result<T, StoreError>;

/// Search result caps used by the tool functions.
pub const SEARCH_LIMIT: usize = 5;
pub const COURSE_SEARCH_LIMIT: usize = 10;
pub const NEWS_LIMIT: usize = 50;

/// Identity directory and content catalogs.
#[async_trait]
pub trait CampusStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    // ── Identity directory ──

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;
    async fn upsert_user(&self, user: UserRecord) -> Result<()>;

    // ── Buildings ──

    /// Active buildings whose name or description contains `term`.
    async fn search_buildings(&self, term: &str, limit: usize) -> Result<Vec<Building>>;
    async fn get_building(&self, id: &str) -> Result<Option<Building>>;
    async fn upsert_building(&self, building: Building) -> Result<()>;

    // ── Departments ──

    /// Active departments whose name, code or description contains `term`.
    async fn search_departments(&self, term: &str, limit: usize) -> Result<Vec<Department>>;
    /// Active departments whose head-of-department name contains `term`.
    async fn search_departments_by_hod(&self, term: &str, limit: usize) -> Result<Vec<Department>>;
    async fn get_department(&self, id: &str) -> Result<Option<Department>>;
    async fn upsert_department(&self, department: Department) -> Result<()>;

    // ── Courses ──

    async fn list_courses(&self, query: &CourseQuery, limit: usize) -> Result<Vec<Course>>;
    async fn get_course(&self, id: &str) -> Result<Option<Course>>;
    async fn upsert_course(&self, course: Course) -> Result<()>;

    // ── News ──

    /// Items matching `scope`, newest first, at most `limit`.
    async fn list_news(&self, scope: &NewsScope, limit: usize) -> Result<Vec<News>>;
    /// Fetch by id regardless of visibility or the active flag.
    async fn get_news(&self, id: &str) -> Result<Option<News>>;
    async fn upsert_news(&self, news: News) -> Result<()>;

    // ── Fee catalogs ──

    /// Active catalogs, newest effective date first.
    async fn list_fee_catalogs(&self) -> Result<Vec<FeeCatalog>>;
    async fn upsert_fee_catalog(&self, catalog: FeeCatalog) -> Result<()>;
    /// Clear the `is_new` badge on every catalog; returns how many changed.
    async fn acknowledge_fee_catalogs(&self) -> Result<usize>;

    // ── Quizzes ──

    async fn list_quizzes(&self, course: Option<&str>) -> Result<Vec<Quiz>>;
    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>>;
    async fn upsert_quiz(&self, quiz: Quiz) -> Result<()>;
}

/// Chat conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation (must hold at least one message).
    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Atomically append `messages` to the conversation.
    ///
    /// Implementations guard the write with the conversation's `version` so
    /// concurrent appends never overwrite each other.
    async fn append_messages(&self, id: &str, messages: Vec<Message>) -> Result<Conversation>;

    /// Summaries of the owner's conversations, most recent activity first.
    async fn list_conversations(&self, owner: &str) -> Result<Vec<ConversationSummary>>;
}
