//! Access policy evaluation for CampusDesk.
//!
//! Pure functions over an [`Actor`](campusdesk_core::Actor) and the resource
//! being read or written:
//!
//! - [`news`]: the audience × role visibility table, the role-scoped news
//!   filter, and the news mutation rule
//! - [`course`]: the course-offering sub-policy and its merge semantics
//! - [`fees`]: who may publish fee catalogs
//!
//! Denial is a value ([`Decision::Deny`]), never an error, so callers map it
//! to a permission response uniformly.

pub mod course;
pub mod decision;
pub mod fees;
pub mod news;

pub use course::{CourseUpdate, apply_course_update, check_course_create, stamp_new_offerings};
pub use decision::{Decision, DenyReason};
pub use fees::check_fee_write;
pub use news::{
    Grant, NewsTarget, can_view, check_news_create, check_news_delete, check_news_update,
    grant_for, visibility_scope,
};
