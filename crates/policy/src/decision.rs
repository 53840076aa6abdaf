//! Allow/deny outcomes.

use serde::Serialize;

/// Why a write was refused. Messages name the capability, not the role
/// matrix behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    #[error("You do not have permission to publish campus-wide announcements")]
    CampusWideNews,

    #[error("You can only manage announcements for your own department")]
    OtherDepartment,

    #[error("You can only manage announcements for courses assigned to you")]
    UnassignedCourse,

    #[error("You do not have permission to manage course announcements")]
    CourseNews,

    #[error("You can only manage course offerings for your own department")]
    OfferingOutsideDepartment,

    #[error("You can only edit courses you lecture")]
    NotLecturer,

    #[error("You are not allowed to change course offerings")]
    OfferingsLocked,

    #[error("You do not have permission to manage courses")]
    CourseManagement,

    #[error("Only the bursary can publish fee catalogs")]
    FeeManagement,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// `Ok(())` on allow, the reason on deny.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }

    /// Allow if either side allows; otherwise keep the first denial.
    pub fn or(self, other: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => Decision::Allow,
            Decision::Deny(reason) => match other() {
                Decision::Allow => Decision::Allow,
                Decision::Deny(_) => Decision::Deny(reason),
            },
        }
    }

    /// Allow only if both sides allow.
    pub fn and(self, other: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => other(),
            deny => deny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators() {
        let deny = || Decision::Deny(DenyReason::CourseNews);
        assert!(deny().or(|| Decision::Allow).is_allowed());
        assert_eq!(
            deny().or(|| Decision::Deny(DenyReason::NotLecturer)),
            Decision::Deny(DenyReason::CourseNews)
        );
        assert!(!Decision::Allow.and(deny).is_allowed());
        assert!(Decision::Allow.and(|| Decision::Allow).into_result().is_ok());
    }

    #[test]
    fn messages_do_not_name_roles() {
        let msg = DenyReason::CampusWideNews.to_string();
        assert!(!msg.contains("admin"));
    }
}
