//! In-memory backend, useful for tests and demos.

use async_trait::async_trait;
use campusdesk_core::actor::UserRecord;
use campusdesk_core::catalog::{Building, Course, CourseQuery, Department, FeeCatalog, Quiz};
use campusdesk_core::error::StoreError;
use campusdesk_core::message::{Conversation, ConversationSummary, Message};
use campusdesk_core::news::{News, NewsScope};
use campusdesk_core::store::{CampusStore, ConversationStore};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Holds every collection in a map behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    buildings: RwLock<HashMap<String, Building>>,
    departments: RwLock<HashMap<String, Department>>,
    courses: RwLock<HashMap<String, Course>>,
    news: RwLock<HashMap<String, News>>,
    fees: RwLock<HashMap<String, FeeCatalog>>,
    quizzes: RwLock<HashMap<String, Quiz>>,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filter, sort by `key` and cap.
fn select<T: Clone, K: Ord>(
    items: &HashMap<String, T>,
    keep: impl Fn(&T) -> bool,
    key: impl Fn(&T) -> K,
    limit: usize,
) -> Vec<T> {
    let mut out: Vec<T> = items.values().filter(|&v| keep(v)).cloned().collect();
    out.sort_by_key(|v| key(v));
    out.truncate(limit);
    out
}

#[async_trait]
impl CampusStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn search_buildings(&self, term: &str, limit: usize) -> Result<Vec<Building>, StoreError> {
        let buildings = self.buildings.read().await;
        Ok(select(
            &buildings,
            |b| b.active && b.matches(term),
            |b| b.name.clone(),
            limit,
        ))
    }

    async fn get_building(&self, id: &str) -> Result<Option<Building>, StoreError> {
        Ok(self.buildings.read().await.get(id).cloned())
    }

    async fn upsert_building(&self, building: Building) -> Result<(), StoreError> {
        self.buildings
            .write()
            .await
            .insert(building.id.clone(), building);
        Ok(())
    }

    async fn search_departments(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Department>, StoreError> {
        let departments = self.departments.read().await;
        Ok(select(
            &departments,
            |d| d.active && d.matches(term),
            |d| d.name.clone(),
            limit,
        ))
    }

    async fn search_departments_by_hod(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Department>, StoreError> {
        let departments = self.departments.read().await;
        Ok(select(
            &departments,
            |d| d.active && d.hod_matches(term),
            |d| d.name.clone(),
            limit,
        ))
    }

    async fn get_department(&self, id: &str) -> Result<Option<Department>, StoreError> {
        Ok(self.departments.read().await.get(id).cloned())
    }

    async fn upsert_department(&self, department: Department) -> Result<(), StoreError> {
        self.departments
            .write()
            .await
            .insert(department.id.clone(), department);
        Ok(())
    }

    async fn list_courses(&self, query: &CourseQuery, limit: usize) -> Result<Vec<Course>, StoreError> {
        let courses = self.courses.read().await;
        Ok(select(
            &courses,
            |c| query.matches(c),
            |c| (c.level, c.code.clone()),
            limit,
        ))
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>, StoreError> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn upsert_course(&self, course: Course) -> Result<(), StoreError> {
        self.courses.write().await.insert(course.id.clone(), course);
        Ok(())
    }

    async fn list_news(&self, scope: &NewsScope, limit: usize) -> Result<Vec<News>, StoreError> {
        let news = self.news.read().await;
        Ok(select(
            &news,
            |n| scope.matches(n),
            |n| std::cmp::Reverse(n.created_at),
            limit,
        ))
    }

    async fn get_news(&self, id: &str) -> Result<Option<News>, StoreError> {
        Ok(self.news.read().await.get(id).cloned())
    }

    async fn upsert_news(&self, news: News) -> Result<(), StoreError> {
        self.news.write().await.insert(news.id.clone(), news);
        Ok(())
    }

    async fn list_fee_catalogs(&self) -> Result<Vec<FeeCatalog>, StoreError> {
        let fees = self.fees.read().await;
        Ok(select(
            &fees,
            |f| f.active,
            |f| std::cmp::Reverse((f.effective_date, f.created_at)),
            usize::MAX,
        ))
    }

    async fn upsert_fee_catalog(&self, catalog: FeeCatalog) -> Result<(), StoreError> {
        self.fees.write().await.insert(catalog.id.clone(), catalog);
        Ok(())
    }

    async fn acknowledge_fee_catalogs(&self) -> Result<usize, StoreError> {
        let mut fees = self.fees.write().await;
        let mut changed = 0;
        for catalog in fees.values_mut().filter(|c| c.is_new) {
            catalog.is_new = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn list_quizzes(&self, course: Option<&str>) -> Result<Vec<Quiz>, StoreError> {
        let quizzes = self.quizzes.read().await;
        Ok(select(
            &quizzes,
            |q| q.active && course.is_none_or(|c| q.course == c),
            |q| q.title.clone(),
            usize::MAX,
        ))
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn upsert_quiz(&self, quiz: Quiz) -> Result<(), StoreError> {
        self.quizzes.write().await.insert(quiz.id.clone(), quiz);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation, StoreError> {
        if conversation.messages.is_empty() {
            return Err(StoreError::Storage(
                "Conversation must hold at least one message".into(),
            ));
        }
        let mut conversations = self.conversations.write().await;
        let id = conversation.id.to_string();
        if conversations.contains_key(&id) {
            return Err(StoreError::Conflict(format!("Conversation {id} already exists")));
        }
        let mut conversation = conversation;
        conversation.version = 1;
        conversations.insert(id, conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn append_messages(&self, id: &str, messages: Vec<Message>) -> Result<Conversation, StoreError> {
        // The write lock serializes appends, so the version only records them.
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("Conversation {id}")))?;
        for message in messages {
            conversation.push(message);
        }
        conversation.updated_at = Utc::now();
        conversation.version += 1;
        Ok(conversation.clone())
    }

    async fn list_conversations(&self, owner: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(select(
            &conversations,
            |c| c.owner == owner,
            |c| std::cmp::Reverse(c.updated_at),
            usize::MAX,
        )
        .iter()
        .map(Conversation::summary)
        .collect())
    }
}
