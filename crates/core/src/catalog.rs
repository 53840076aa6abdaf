//! Campus content catalogs: buildings, departments, courses, quizzes and
//! fee catalogs.
//!
//! Every record carries an `active` flag. Deletion is a soft delete that
//! clears the flag; inactive records never appear in listing or search.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Case-insensitive substring match. An empty needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Human-readable directions ("North campus, beside the main gate").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Building {
    pub fn matches(&self, term: &str) -> bool {
        contains_ci(&self.name, term) || contains_ci(&self.description, term)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub faculty: String,
    #[serde(default)]
    pub description: String,
    /// Head of department.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hod: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Department {
    pub fn matches(&self, term: &str) -> bool {
        contains_ci(&self.name, term)
            || contains_ci(&self.code, term)
            || contains_ci(&self.description, term)
    }

    pub fn hod_matches(&self, term: &str) -> bool {
        self.hod.as_deref().is_some_and(|h| contains_ci(h, term))
    }
}

/// One department offering a course at a given level.
///
/// `(department, level)` is the merge key for departmental-admin writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOffering {
    pub department: String,
    pub level: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default)]
    pub lecturers: Vec<String>,
    #[serde(default)]
    pub compulsory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CourseOffering {
    pub fn key(&self) -> (&str, u16) {
        (&self.department, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credit_units: u8,
    pub level: u16,
    /// Owning department.
    pub department: String,
    #[serde(default)]
    pub departments_offering: Vec<CourseOffering>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Course {
    pub fn matches(&self, term: &str) -> bool {
        contains_ci(&self.code, term)
            || contains_ci(&self.title, term)
            || contains_ci(&self.description, term)
    }

    /// Whether the user is listed as a lecturer on any offering row.
    pub fn is_lectured_by(&self, user_id: &str) -> bool {
        self.departments_offering
            .iter()
            .any(|o| o.lecturers.iter().any(|l| l == user_id))
    }
}

/// Filter for course listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub level: Option<u16>,
}

impl CourseQuery {
    pub fn matches(&self, course: &Course) -> bool {
        course.active
            && self.search.as_deref().is_none_or(|t| course.matches(t))
            && self.department.as_deref().is_none_or(|d| {
                course.department == d
                    || course.departments_offering.iter().any(|o| o.department == d)
            })
            && self.level.is_none_or(|l| course.level == l)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`. Hidden from non-admin callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub course: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Quiz {
    pub fn without_answers(mut self) -> Self {
        for q in &mut self.questions {
            q.answer = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeItem {
    pub name: String,
    pub amount: f64,
}

/// A fee schedule keyed by `(level, session)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCatalog {
    pub id: String,
    pub level: String,
    /// Academic session, e.g. `2025/2026`.
    pub session: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub items: Vec<FeeItem>,
    /// UI "unseen" badge only.
    #[serde(default)]
    pub is_new: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "NGN".into()
}

impl FeeCatalog {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|i| i.amount).sum()
    }

    fn recency(&self) -> (NaiveDate, DateTime<Utc>) {
        (self.effective_date, self.created_at)
    }
}

/// Resolve the best-matching fee catalog.
///
/// Fallback chain over active catalogs: exact `(level, session)`, then
/// level only, then session only, then the most recent. Within each step the
/// most recent by effective date (then creation time) wins.
pub fn resolve_fee_catalog<'a>(
    catalogs: &'a [FeeCatalog],
    level: Option<&str>,
    session: Option<&str>,
) -> Option<&'a FeeCatalog> {
    let level = level.map(str::trim).filter(|s| !s.is_empty());
    let session = session.map(str::trim).filter(|s| !s.is_empty());

    let newest = |pred: &dyn Fn(&FeeCatalog) -> bool| {
        catalogs
            .iter()
            .filter(|c| c.active && pred(c))
            .max_by_key(|c| c.recency())
    };

    if let (Some(l), Some(s)) = (level, session) {
        if let Some(c) = newest(&|c| c.level == l && c.session == s) {
            return Some(c);
        }
    }
    if let Some(l) = level {
        if let Some(c) = newest(&|c| c.level == l) {
            return Some(c);
        }
    }
    if let Some(s) = session {
        if let Some(c) = newest(&|c| c.session == s) {
            return Some(c);
        }
    }
    newest(&|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(id: &str, level: &str, session: &str, day: u32) -> FeeCatalog {
        FeeCatalog {
            id: id.into(),
            level: level.into(),
            session: session.into(),
            currency: "NGN".into(),
            effective_date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            items: vec![FeeItem {
                name: "Tuition".into(),
                amount: 1000.0,
            }],
            is_new: true,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exact_match_wins() {
        let all = vec![
            catalog("a", "100", "2024/2025", 1),
            catalog("b", "100", "2025/2026", 2),
        ];
        let c = resolve_fee_catalog(&all, Some("100"), Some("2025/2026")).unwrap();
        assert_eq!(c.id, "b");
    }

    #[test]
    fn falls_back_to_level_only() {
        let all = vec![
            catalog("a", "100", "2024/2025", 1),
            catalog("b", "200", "2025/2026", 2),
        ];
        let c = resolve_fee_catalog(&all, Some("100"), Some("2025/2026")).unwrap();
        assert_eq!(c.id, "a");
    }

    #[test]
    fn falls_back_to_session_then_most_recent() {
        let all = vec![
            catalog("a", "300", "2024/2025", 1),
            catalog("b", "200", "2025/2026", 2),
            catalog("c", "400", "2023/2024", 9),
        ];
        assert_eq!(
            resolve_fee_catalog(&all, Some("100"), Some("2025/2026")).unwrap().id,
            "b"
        );
        assert_eq!(resolve_fee_catalog(&all, Some("100"), Some("1999/2000")).unwrap().id, "c");
    }

    #[test]
    fn inactive_catalogs_are_ignored() {
        let mut old = catalog("a", "100", "2025/2026", 1);
        old.active = false;
        assert!(resolve_fee_catalog(&[old], Some("100"), None).is_none());
    }

    #[test]
    fn course_query_matches_offering_department() {
        let course = Course {
            id: "c1".into(),
            code: "MTH101".into(),
            title: "Elementary Mathematics".into(),
            description: String::new(),
            credit_units: 3,
            level: 100,
            department: "math".into(),
            departments_offering: vec![CourseOffering {
                department: "cs".into(),
                level: 100,
                semester: None,
                lecturers: vec!["lect1".into()],
                compulsory: true,
                added_by: None,
                updated_at: None,
            }],
            active: true,
        };
        let q = CourseQuery {
            department: Some("cs".into()),
            ..Default::default()
        };
        assert!(q.matches(&course));
        assert!(course.is_lectured_by("lect1"));
        assert!(course.matches("elementary"));
    }

    #[test]
    fn quiz_answers_can_be_hidden() {
        let quiz = Quiz {
            id: "q".into(),
            course: "c1".into(),
            title: "Week 1".into(),
            questions: vec![QuizQuestion {
                prompt: "2+2?".into(),
                options: vec!["3".into(), "4".into()],
                answer: Some(1),
            }],
            active: true,
        };
        assert!(quiz.without_answers().questions[0].answer.is_none());
    }
}
