//! Audit logging: structured records of security-relevant outcomes.
//!
//! The gateway records rejected credentials, policy denials and every
//! successful write to campus content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub actor: String,
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A bearer token was rejected
    AuthFailure,
    /// A token was issued
    TokenIssued,
    /// The access policy refused a write
    PermissionDenied { capability: String },
    /// Campus content was created, edited or soft-deleted
    ContentChanged { resource: String, action: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Keeps a bounded in-memory tail of entries and forwards each one to its
/// sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    capacity: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

const DEFAULT_CAPACITY: usize = 1024;

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            capacity: DEFAULT_CAPACITY,
            sinks,
        }
    }

    /// A logger that writes through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log(
        &self,
        event: AuditEvent,
        actor: &str,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            actor: actor.into(),
            target: target.into(),
            outcome,
            details,
        };

        {
            let mut entries = self.lock();
            if entries.len() >= self.capacity {
                entries.remove(0);
            }
            entries.push(entry.clone());
        }

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    pub fn auth_failure(&self, target: &str, reason: &str) {
        self.log(
            AuditEvent::AuthFailure,
            "anonymous",
            target,
            AuditOutcome::Denied,
            Some(reason.to_string()),
        );
    }

    pub fn denied(&self, actor: &str, target: &str, capability: &str) {
        self.log(
            AuditEvent::PermissionDenied {
                capability: capability.to_string(),
            },
            actor,
            target,
            AuditOutcome::Denied,
            None,
        );
    }

    pub fn changed(&self, actor: &str, resource: &str, id: &str, action: &str) {
        self.log(
            AuditEvent::ContentChanged {
                resource: resource.to_string(),
                action: action.to_string(),
            },
            actor,
            id,
            AuditOutcome::Success,
            None,
        );
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Writes each entry as a `tracing` event; denials at warn level.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        match entry.outcome {
            AuditOutcome::Success => tracing::info!(
                event = ?entry.event,
                actor = %entry.actor,
                target = %entry.target,
                "AUDIT"
            ),
            AuditOutcome::Failure | AuditOutcome::Denied => tracing::warn!(
                event = ?entry.event,
                actor = %entry.actor,
                target = %entry.target,
                outcome = ?entry.outcome,
                details = ?entry.details,
                "AUDIT"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn log_and_filter_by_outcome() {
        let logger = AuditLogger::new();
        logger.auth_failure("/news", "Token has expired");
        logger.denied("d1", "news:n1", "department news");
        logger.changed("root", "course", "csc101", "update");

        assert_eq!(logger.count(), 3);
        let denied = logger.entries_by_outcome(&AuditOutcome::Denied);
        assert_eq!(denied.len(), 2);
        assert_eq!(denied[1].actor, "d1");
        assert_eq!(
            logger.entries_by_outcome(&AuditOutcome::Success)[0].event,
            AuditEvent::ContentChanged {
                resource: "course".into(),
                action: "update".into()
            }
        );
    }

    #[test]
    fn tail_is_bounded() {
        let mut logger = AuditLogger::new();
        logger.capacity = 2;
        for i in 0..5 {
            logger.changed("root", "news", &i.to_string(), "create");
        }
        let targets: Vec<String> = logger.entries().into_iter().map(|e| e.target).collect();
        assert_eq!(targets, vec!["3".to_string(), "4".to_string()]);
    }

    #[test]
    fn permission_denied_serializes_with_type_tag() {
        let json = serde_json::to_value(AuditEvent::PermissionDenied {
            capability: "course offerings".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "permission_denied");
    }

    #[test]
    fn custom_sink_receives_events() {
        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.actor.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::with_sinks(vec![Box::new(TestSink {
            received: received.clone(),
        })]);
        logger.log(AuditEvent::TokenIssued, "s1", "s1", AuditOutcome::Success, None);

        assert_eq!(*received.lock().unwrap(), vec!["s1".to_string()]);
    }
}
