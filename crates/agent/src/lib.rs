//! The chat assistant: LLM tool loop, offline fallback and reply synthesis.
//!
//! A chat turn flows through [`ChatOrchestrator::converse`]:
//!
//! 1. **Load** the caller's conversation (or a guest's client-held history)
//! 2. **Prompt** the LLM with the caller's identity and the campus tools
//! 3. **Execute** the first requested tool call, feed the result back, repeat
//! 4. **Reply** with the model's text, a synthesized summary, or the fallback
//! 5. **Persist** both messages for signed-in users
//!
//! The loop is bounded by `max_tool_rounds`; provider errors and timeouts
//! never reach the caller.

pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod summary;

#[cfg(test)]
mod test_helpers;

pub use fallback::{FallbackReply, FallbackResponder};
pub use orchestrator::{ChatOrchestrator, ChatReply, ChatTurn, OrchestratorSettings, has_location};
pub use prompt::system_prompt;
pub use summary::synthesize_reply;
