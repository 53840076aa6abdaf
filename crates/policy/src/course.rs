//! Course management and the course-offering sub-policy.

use campusdesk_core::catalog::{Course, CourseOffering};
use campusdesk_core::{Actor, Role};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::decision::{Decision, DenyReason};

/// A partial course edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub credit_units: Option<u8>,
    pub departments_offering: Option<Vec<CourseOffering>>,
}

impl CourseUpdate {
    /// Whether any course detail other than the offerings changes.
    pub fn touches_details(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.credit_units.is_some()
    }
}

fn offerings_in_own_department(actor: &Actor, offerings: &[CourseOffering]) -> Decision {
    if offerings.iter().all(|o| actor.in_department(&o.department)) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::OfferingOutsideDepartment)
    }
}

/// Only system admins and departmental admins create courses. A departmental
/// admin's course must belong to their department, and so must every offering.
pub fn check_course_create(actor: &Actor, course: &Course) -> Decision {
    match actor.role {
        Role::SystemAdmin => Decision::Allow,
        Role::DepartmentalAdmin => {
            if !actor.in_department(&course.department) {
                return Decision::Deny(DenyReason::OfferingOutsideDepartment);
            }
            offerings_in_own_department(actor, &course.departments_offering)
        }
        _ => Decision::Deny(DenyReason::CourseManagement),
    }
}

/// Stamp offerings on a freshly created course with the writer.
pub fn stamp_new_offerings(actor: &Actor, course: &mut Course, now: DateTime<Utc>) {
    if actor.role == Role::SystemAdmin {
        return;
    }
    for offering in &mut course.departments_offering {
        offering.added_by = Some(actor.id.clone());
        offering.updated_at = Some(now);
    }
}

/// Check `update` against `existing` and return the course as it should be
/// stored. Nothing is applied when any part of the update is refused.
///
/// System admins replace the offering list wholesale. Departmental admins
/// merge rows by `(department, level)`: matched rows are updated field by
/// field and keep their original `added_by`, new rows are stamped with the
/// writer and `now` regardless of what the caller sent.
pub fn apply_course_update(
    actor: &Actor,
    existing: &Course,
    update: CourseUpdate,
    now: DateTime<Utc>,
) -> Result<Course, DenyReason> {
    match actor.role {
        Role::SystemAdmin => {}
        Role::DepartmentalAdmin => {
            // Another department's course: only the admin's own offering rows.
            if !actor.in_department(&existing.department) && update.touches_details() {
                return Err(DenyReason::OfferingOutsideDepartment);
            }
            if let Some(offerings) = &update.departments_offering {
                offerings_in_own_department(actor, offerings).into_result()?;
            }
        }
        Role::LecturerAdmin => {
            if !existing.is_lectured_by(&actor.id) {
                return Err(DenyReason::NotLecturer);
            }
            if update.departments_offering.is_some() {
                return Err(DenyReason::OfferingsLocked);
            }
        }
        _ => return Err(DenyReason::CourseManagement),
    }

    let mut course = existing.clone();
    if let Some(title) = update.title {
        course.title = title;
    }
    if let Some(description) = update.description {
        course.description = description;
    }
    if let Some(credits) = update.credit_units {
        course.credit_units = credits;
    }

    if let Some(incoming) = update.departments_offering {
        if actor.role == Role::SystemAdmin {
            course.departments_offering = incoming;
        } else {
            merge_offerings(&mut course.departments_offering, incoming, &actor.id, now);
        }
    }

    Ok(course)
}

fn merge_offerings(
    current: &mut Vec<CourseOffering>,
    incoming: Vec<CourseOffering>,
    writer: &str,
    now: DateTime<Utc>,
) {
    for row in incoming {
        match current.iter_mut().find(|o| o.key() == row.key()) {
            Some(existing) => {
                if row.semester.is_some() {
                    existing.semester = row.semester;
                }
                existing.lecturers = row.lecturers;
                existing.compulsory = row.compulsory;
                if existing.added_by.is_none() {
                    existing.added_by = Some(writer.to_string());
                }
                existing.updated_at = Some(now);
            }
            None => current.push(CourseOffering {
                added_by: Some(writer.to_string()),
                updated_at: Some(now),
                ..row
            }),
        }
    }
}
