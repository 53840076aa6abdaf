//! News items and the role-scoped query filter used to list them.
//!
//! A [`NewsScope`] is a disjunction of [`ScopeClause`]s plus an optional tag
//! filter. The access policy builds one per request; stores evaluate it either
//! in process ([`NewsScope::matches`]) or by translating it into their own
//! query language.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a news item is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Everyone,
    StudentsOnly,
    StaffOnly,
    DepartmentSpecific,
    CourseSpecific,
}

impl Audience {
    pub const ALL: [Audience; 5] = [
        Audience::Everyone,
        Audience::StudentsOnly,
        Audience::StaffOnly,
        Audience::DepartmentSpecific,
        Audience::CourseSpecific,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Everyone => "everyone",
            Audience::StudentsOnly => "students_only",
            Audience::StaffOnly => "staff_only",
            Audience::DepartmentSpecific => "department_specific",
            Audience::CourseSpecific => "course_specific",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: String,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    /// Meaningful only for `department_specific`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Meaningful only for `course_specific`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// User id of the original author.
    pub author: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl News {
    /// Clear the scoping fields that the audience does not select.
    pub fn normalize_scope(&mut self) {
        match self.audience {
            Audience::DepartmentSpecific => self.courses.clear(),
            Audience::CourseSpecific => self.department = None,
            _ => {
                self.department = None;
                self.courses.clear();
            }
        }
    }
}

/// One disjunct of a news visibility filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeClause {
    /// Items addressed to exactly this audience.
    Audience { audience: Audience },
    /// Department-scoped items for one department.
    Department { department: String },
    /// Every department-scoped item.
    AnyDepartment,
    /// Course-scoped items sharing at least one course.
    Courses { courses: Vec<String> },
    /// Every course-scoped item.
    AnyCourse,
}

impl ScopeClause {
    pub fn matches(&self, news: &News) -> bool {
        match self {
            ScopeClause::Audience { audience } => news.audience == *audience,
            ScopeClause::Department { department } => {
                news.audience == Audience::DepartmentSpecific
                    && news.department.as_deref() == Some(department.as_str())
            }
            ScopeClause::AnyDepartment => news.audience == Audience::DepartmentSpecific,
            ScopeClause::Courses { courses } => {
                news.audience == Audience::CourseSpecific
                    && news.courses.iter().any(|c| courses.contains(c))
            }
            ScopeClause::AnyCourse => news.audience == Audience::CourseSpecific,
        }
    }
}

/// A role-scoped news query: active items matching any clause and the tag
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsScope {
    pub clauses: Vec<ScopeClause>,
    /// When non-empty, an item passes only if it is untagged or shares a tag.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewsScope {
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn tags_match(&self, news: &News) -> bool {
        self.tags.is_empty() || news.tags.is_empty() || news.tags.iter().any(|t| self.tags.contains(t))
    }

    pub fn matches(&self, news: &News) -> bool {
        news.active && self.tags_match(news) && self.clauses.iter().any(|c| c.matches(news))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news(audience: Audience) -> News {
        News {
            id: "n1".into(),
            title: "Title".into(),
            content: "Body".into(),
            audience,
            department: None,
            courses: vec![],
            tags: vec![],
            author: "a1".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn department_clause_requires_matching_department() {
        let mut item = news(Audience::DepartmentSpecific);
        item.department = Some("math".into());
        let clause = ScopeClause::Department {
            department: "cs".into(),
        };
        assert!(!clause.matches(&item));
        assert!(ScopeClause::AnyDepartment.matches(&item));
    }

    #[test]
    fn tag_filter_lets_untagged_items_through() {
        let scope = NewsScope {
            clauses: vec![ScopeClause::Audience {
                audience: Audience::Everyone,
            }],
            tags: vec!["sports".into()],
        };
        let mut item = news(Audience::Everyone);
        assert!(scope.matches(&item));
        item.tags = vec!["exams".into()];
        assert!(!scope.matches(&item));
        item.tags.push("sports".into());
        assert!(scope.matches(&item));
    }

    #[test]
    fn inactive_items_never_match() {
        let scope = NewsScope {
            clauses: vec![ScopeClause::Audience {
                audience: Audience::Everyone,
            }],
            tags: vec![],
        };
        let mut item = news(Audience::Everyone);
        item.active = false;
        assert!(!scope.matches(&item));
    }

    #[test]
    fn normalize_scope_drops_unselected_fields() {
        let mut item = news(Audience::CourseSpecific);
        item.department = Some("cs".into());
        item.courses = vec!["csc101".into()];
        item.normalize_scope();
        assert!(item.department.is_none());
        assert_eq!(item.courses, vec!["csc101".to_string()]);
    }
}
