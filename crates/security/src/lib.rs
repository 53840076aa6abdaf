//! Security module for CampusDesk: bearer tokens and audit logging.
//!
//! Provides:
//! - **Tokens**: HS256-signed bearer tokens carrying the actor's role and scope
//! - **Audit logging**: Structured records of authentication failures,
//!   permission denials and content changes

pub mod audit;
pub mod token;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use token::{Claims, TokenError, TokenSigner, bearer_token};
