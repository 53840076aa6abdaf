//! # CampusDesk Core
//!
//! Domain types, traits, and error definitions for the CampusDesk university
//! assistant. This crate has **zero framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Layout
//!
//! - [`actor`]: who is asking (role, department, course assignments)
//! - [`catalog`]: buildings, departments, courses, quizzes, fee catalogs
//! - [`news`]: news items, audiences, and the role-scoped query filter
//! - [`message`]: chat transcripts and tool-invocation audit records
//! - [`provider`] / [`tool`]: the seams to the LLM and to local tool functions
//! - [`store`]: persistence traits for the catalogs and conversations

pub mod actor;
pub mod catalog;
pub mod error;
pub mod event;
pub mod message;
pub mod news;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use actor::{Actor, Role, UserRecord};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageRole, ToolInvocation};
pub use news::{Audience, News, NewsScope};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use store::{CampusStore, ConversationStore};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
