//! News visibility and news mutation rules.
//!
//! Visibility is a declarative table indexed by `(audience, role)`. Each cell
//! is a [`Grant`]; conditional cells are resolved against the actor's
//! department or course assignments. The clauses an actor earns across all
//! audiences are OR'd into a single [`NewsScope`].

use campusdesk_core::news::ScopeClause;
use campusdesk_core::{Actor, Audience, News, NewsScope, Role};
use tracing::debug;

use crate::decision::{Decision, DenyReason};

/// How a role relates to an audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Every item with this audience.
    Always,
    /// Items scoped to the actor's department.
    IfDepartment,
    /// Items sharing one of the actor's courses.
    IfCourse,
    Never,
}

use Grant::{Always, IfCourse, IfDepartment, Never};

/// Columns follow [`Role::ALL`]: guest, student, staff, lecturer_admin,
/// departmental_admin, bursary_admin, system_admin.
const VISIBILITY: [(Audience, [Grant; 7]); 5] = [
    (Audience::Everyone, [Always, Always, Always, Always, Always, Always, Always]),
    (Audience::StudentsOnly, [Never, Always, Never, Always, Always, Always, Always]),
    (Audience::StaffOnly, [Never, Never, Always, Always, Always, Always, Always]),
    (
        Audience::DepartmentSpecific,
        [Never, IfDepartment, IfDepartment, IfDepartment, IfDepartment, Always, Always],
    ),
    (
        Audience::CourseSpecific,
        [Never, IfCourse, IfCourse, IfCourse, IfCourse, IfCourse, Always],
    ),
];

fn role_index(role: Role) -> usize {
    Role::ALL.iter().position(|r| *r == role).unwrap_or(0)
}

/// The table cell for `(audience, role)`.
pub fn grant_for(audience: Audience, role: Role) -> Grant {
    VISIBILITY
        .iter()
        .find(|(a, _)| *a == audience)
        .map(|(_, row)| row[role_index(role)])
        .unwrap_or(Never)
}

/// Build the role-scoped filter for "list all news" by `actor`.
pub fn visibility_scope(actor: &Actor) -> NewsScope {
    let mut clauses = Vec::new();

    for audience in Audience::ALL {
        match grant_for(audience, actor.role) {
            Always => clauses.push(ScopeClause::Audience { audience }),
            IfDepartment => {
                if let Some(department) = &actor.department {
                    clauses.push(ScopeClause::Department {
                        department: department.clone(),
                    });
                }
            }
            IfCourse => {
                if !actor.courses.is_empty() {
                    clauses.push(ScopeClause::Courses {
                        courses: actor.courses.clone(),
                    });
                }
            }
            Never => {}
        }
    }

    debug!(actor_id = %actor.id, role = %actor.role, clauses = clauses.len(), "Built news scope");
    NewsScope {
        clauses,
        tags: Vec::new(),
    }
}

/// Whether `actor` may see a single item.
pub fn can_view(actor: &Actor, news: &News) -> bool {
    visibility_scope(actor).matches(news)
}

/// The audience and scoping of a news write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsTarget {
    pub audience: Audience,
    pub department: Option<String>,
    pub courses: Vec<String>,
}

impl NewsTarget {
    /// Drop the scoping fields the audience does not select.
    pub fn normalized(mut self) -> Self {
        match self.audience {
            Audience::DepartmentSpecific => self.courses.clear(),
            Audience::CourseSpecific => self.department = None,
            _ => {
                self.department = None;
                self.courses.clear();
            }
        }
        self
    }
}

impl From<&News> for NewsTarget {
    fn from(news: &News) -> Self {
        Self {
            audience: news.audience,
            department: news.department.clone(),
            courses: news.courses.clone(),
        }
    }
}

/// Whether `actor` may write news addressed to `target`.
///
/// Course-scoped writes by a lecturer must cover only assigned courses; a
/// single unassigned course rejects the whole write.
fn check_target(actor: &Actor, target: &NewsTarget) -> Decision {
    match target.audience {
        Audience::Everyone | Audience::StudentsOnly | Audience::StaffOnly => match actor.role {
            Role::SystemAdmin | Role::BursaryAdmin => Decision::Allow,
            _ => Decision::Deny(DenyReason::CampusWideNews),
        },
        Audience::DepartmentSpecific => match actor.role {
            Role::SystemAdmin | Role::BursaryAdmin => Decision::Allow,
            Role::DepartmentalAdmin
                if target
                    .department
                    .as_deref()
                    .is_some_and(|d| actor.in_department(d)) =>
            {
                Decision::Allow
            }
            Role::DepartmentalAdmin => Decision::Deny(DenyReason::OtherDepartment),
            _ => Decision::Deny(DenyReason::CampusWideNews),
        },
        Audience::CourseSpecific => match actor.role {
            Role::SystemAdmin | Role::DepartmentalAdmin => Decision::Allow,
            Role::LecturerAdmin
                if !target.courses.is_empty()
                    && target.courses.iter().all(|c| actor.courses.contains(c)) =>
            {
                Decision::Allow
            }
            Role::LecturerAdmin => Decision::Deny(DenyReason::UnassignedCourse),
            _ => Decision::Deny(DenyReason::CourseNews),
        },
    }
}

pub fn check_news_create(actor: &Actor, target: &NewsTarget) -> Decision {
    check_target(actor, target)
}

/// The author may edit in place; moving the item to another audience needs
/// write access to the new target. Anyone else needs write access to both
/// the current and the requested target.
pub fn check_news_update(actor: &Actor, existing: &News, target: &NewsTarget) -> Decision {
    let current = NewsTarget::from(existing).normalized();
    if existing.author == actor.id {
        if target.clone().normalized() == current {
            return Decision::Allow;
        }
        return check_target(actor, target);
    }
    check_target(actor, &current).and(|| check_target(actor, target))
}

pub fn check_news_delete(actor: &Actor, existing: &News) -> Decision {
    if existing.author == actor.id {
        return Decision::Allow;
    }
    check_target(actor, &NewsTarget::from(existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: &str, audience: Audience) -> News {
        News {
            id: id.into(),
            title: id.into(),
            content: String::new(),
            audience,
            department: None,
            courses: vec![],
            tags: vec![],
            author: "author".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> Vec<News> {
        let mut dept_cs = item("dept-cs", Audience::DepartmentSpecific);
        dept_cs.department = Some("cs".into());
        let mut dept_math = item("dept-math", Audience::DepartmentSpecific);
        dept_math.department = Some("math".into());
        let mut course = item("course-csc101", Audience::CourseSpecific);
        course.courses = vec!["csc101".into()];
        vec![
            item("everyone", Audience::Everyone),
            item("students", Audience::StudentsOnly),
            item("staff", Audience::StaffOnly),
            dept_cs,
            dept_math,
            course,
        ]
    }

    fn actors() -> Vec<Actor> {
        Role::ALL
            .into_iter()
            .flat_map(|role| {
                [
                    Actor::new("x", role),
                    Actor::new("x", role).with_department("cs").with_courses(["csc101"]),
                    Actor::new("x", role).with_department("math"),
                ]
            })
            .collect()
    }

    fn visible(actor: &Actor, items: &[News]) -> Vec<String> {
        items
            .iter()
            .filter(|n| can_view(actor, n))
            .map(|n| n.id.clone())
            .collect()
    }

    #[test]
    fn system_admin_sees_a_superset_of_every_role() {
        let items = fixture();
        let admin = Actor::new("root", Role::SystemAdmin);
        let admin_sees = visible(&admin, &items);
        assert_eq!(admin_sees.len(), items.len());
        for actor in actors() {
            for id in visible(&actor, &items) {
                assert!(admin_sees.contains(&id), "{:?} sees {id}", actor.role);
            }
        }
    }

    #[test]
    fn guest_sees_only_everyone_items() {
        let items = fixture();
        let guest = Actor::guest().with_department("cs").with_courses(["csc101"]);
        assert_eq!(visible(&guest, &items), vec!["everyone".to_string()]);
    }

    #[test]
    fn student_does_not_see_other_department() {
        let student = Actor::new("s1", Role::Student).with_department("cs");
        let items = vec![
            item("everyone", Audience::Everyone),
            fixture().into_iter().find(|n| n.id == "dept-math").unwrap(),
        ];
        assert_eq!(visible(&student, &items), vec!["everyone".to_string()]);
    }

    #[test]
    fn staff_does_not_see_student_notices() {
        let staff = Actor::new("st", Role::Staff);
        let seen = visible(&staff, &fixture());
        assert!(seen.contains(&"staff".to_string()));
        assert!(!seen.contains(&"students".to_string()));
    }

    #[test]
    fn bursary_admin_sees_all_departments_but_only_own_courses() {
        let bursar = Actor::new("b", Role::BursaryAdmin);
        let seen = visible(&bursar, &fixture());
        assert!(seen.contains(&"dept-cs".to_string()));
        assert!(seen.contains(&"dept-math".to_string()));
        assert!(!seen.contains(&"course-csc101".to_string()));
    }

    #[test]
    fn lecturer_sees_assigned_course_news() {
        let lecturer = Actor::new("l", Role::LecturerAdmin).with_courses(["csc101"]);
        assert!(visible(&lecturer, &fixture()).contains(&"course-csc101".to_string()));
    }

    #[test]
    fn guest_scope_is_a_single_clause() {
        let scope = visibility_scope(&Actor::guest());
        assert_eq!(
            scope.clauses,
            vec![ScopeClause::Audience {
                audience: Audience::Everyone
            }]
        );
    }

    fn target(audience: Audience, department: Option<&str>, courses: &[&str]) -> NewsTarget {
        NewsTarget {
            audience,
            department: department.map(String::from),
            courses: courses.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn departmental_admin_cannot_post_to_other_department() {
        let admin = Actor::new("d", Role::DepartmentalAdmin).with_department("cs");
        let decision = check_news_create(&admin, &target(Audience::DepartmentSpecific, Some("math"), &[]));
        assert_eq!(decision, Decision::Deny(DenyReason::OtherDepartment));
        assert!(
            check_news_create(&admin, &target(Audience::DepartmentSpecific, Some("cs"), &[]))
                .is_allowed()
        );
    }

    #[test]
    fn campus_wide_news_requires_system_or_bursary() {
        for role in Role::ALL {
            let decision = check_news_create(&Actor::new("x", role), &target(Audience::Everyone, None, &[]));
            let expected = matches!(role, Role::SystemAdmin | Role::BursaryAdmin);
            assert_eq!(decision.is_allowed(), expected, "{role}");
        }
    }

    #[test]
    fn lecturer_must_own_every_target_course() {
        let lecturer = Actor::new("l", Role::LecturerAdmin).with_courses(["csc101"]);
        assert!(
            check_news_create(&lecturer, &target(Audience::CourseSpecific, None, &["csc101"]))
                .is_allowed()
        );
        assert_eq!(
            check_news_create(
                &lecturer,
                &target(Audience::CourseSpecific, None, &["csc101", "mth101"])
            ),
            Decision::Deny(DenyReason::UnassignedCourse)
        );
    }

    #[test]
    fn author_may_edit_and_delete_regardless_of_role() {
        let mut existing = item("n", Audience::Everyone);
        existing.author = "s1".into();
        let author = Actor::new("s1", Role::Student);
        assert!(check_news_update(&author, &existing, &NewsTarget::from(&existing)).is_allowed());
        assert!(check_news_delete(&author, &existing).is_allowed());

        let other = Actor::new("s2", Role::Student);
        assert!(!check_news_delete(&other, &existing).is_allowed());
    }

    #[test]
    fn author_cannot_retarget_beyond_own_rights() {
        let lecturer = Actor::new("l", Role::LecturerAdmin).with_courses(["csc101", "csc201"]);
        let mut existing = item("n", Audience::CourseSpecific);
        existing.courses = vec!["csc101".into()];
        existing.author = "l".into();

        // leftover scoping fields do not count as a change
        let mut same = NewsTarget::from(&existing);
        same.department = Some("cs".into());
        assert!(check_news_update(&lecturer, &existing, &same).is_allowed());

        let widen = target(Audience::Everyone, None, &[]);
        assert_eq!(
            check_news_update(&lecturer, &existing, &widen),
            Decision::Deny(DenyReason::CampusWideNews)
        );
        let other_course = target(Audience::CourseSpecific, None, &["mth101"]);
        assert_eq!(
            check_news_update(&lecturer, &existing, &other_course),
            Decision::Deny(DenyReason::UnassignedCourse)
        );
        let own_course = target(Audience::CourseSpecific, None, &["csc201"]);
        assert!(check_news_update(&lecturer, &existing, &own_course).is_allowed());
    }

    #[test]
    fn update_checks_both_old_and_new_audience() {
        let admin = Actor::new("d", Role::DepartmentalAdmin).with_department("cs");
        let mut existing = item("n", Audience::DepartmentSpecific);
        existing.department = Some("cs".into());
        let widen = target(Audience::Everyone, None, &[]);
        assert!(!check_news_update(&admin, &existing, &widen).is_allowed());
    }
}
