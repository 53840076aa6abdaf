//! Actors and the identity directory record they are derived from.
//!
//! An [`Actor`] is built fresh for every request from a verified credential
//! and is never mutated afterwards. [`UserRecord`] is the persisted directory
//! entry that credentials are issued from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of roles known to the campus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Student,
    Staff,
    LecturerAdmin,
    DepartmentalAdmin,
    BursaryAdmin,
    SystemAdmin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 7] = [
        Role::Guest,
        Role::Student,
        Role::Staff,
        Role::LecturerAdmin,
        Role::DepartmentalAdmin,
        Role::BursaryAdmin,
        Role::SystemAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Student => "student",
            Role::Staff => "staff",
            Role::LecturerAdmin => "lecturer_admin",
            Role::DepartmentalAdmin => "departmental_admin",
            Role::BursaryAdmin => "bursary_admin",
            Role::SystemAdmin => "system_admin",
        }
    }

    /// Whether this is one of the four administrative roles.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Role::LecturerAdmin | Role::DepartmentalAdmin | Role::BursaryAdmin | Role::SystemAdmin
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The authenticated (or guest) identity issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Course assignments (meaningful for lecturer admins).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<String>,
}

impl Actor {
    /// An anonymous guest. Guests are never persisted.
    pub fn guest() -> Self {
        Self {
            id: "guest".into(),
            role: Role::Guest,
            department: None,
            courses: Vec::new(),
        }
    }

    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            department: None,
            courses: Vec::new(),
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_courses<I, S>(mut self, courses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.courses = courses.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest
    }

    /// Whether the actor belongs to the given department.
    pub fn in_department(&self, department: &str) -> bool {
        self.department.as_deref() == Some(department)
    }

    /// Whether the actor is assigned to any of the given courses.
    pub fn assigned_to_any(&self, courses: &[String]) -> bool {
        courses.iter().any(|c| self.courses.contains(c))
    }
}

/// A person in the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl UserRecord {
    /// Project the directory entry into a request-scoped actor.
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            role: self.role,
            department: self.department.clone(),
            courses: self.courses.clone(),
        }
    }
}
