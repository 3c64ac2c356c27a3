//! Audit logging infrastructure.
//!
//! Backends receive an [`AuditLogger`] at construction and report declined
//! operations, binds and session closes through it, so tests can observe
//! diagnostics without a global subscriber.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ldapback_proto::ResultCode;
use parking_lot::Mutex;

/// Counter for generating unique event IDs.
static EVENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Microseconds since the Unix epoch, or 0 if the clock is before it.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Generate a unique event ID using timestamp and counter.
fn generate_event_id() -> [u8; 16] {
    let ts = current_timestamp();
    let counter = EVENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut id = [0u8; 16];
    id[0..8].copy_from_slice(&ts.to_be_bytes());
    id[8..16].copy_from_slice(&counter.to_be_bytes());
    id
}

/// Mutating operations a backend may decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    /// Add an entry.
    Add,
    /// Modify an entry.
    Modify,
    /// Delete an entry.
    Delete,
}

impl std::fmt::Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationOp::Add => write!(f, "add"),
            MutationOp::Modify => write!(f, "modify"),
            MutationOp::Delete => write!(f, "delete"),
        }
    }
}

/// Types of audit events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEventType {
    /// A mutating operation was declined because the backend does not implement it.
    OperationDeclined {
        /// Declined operation.
        operation: MutationOp,
        /// Target DN of the request.
        target_dn: String,
        /// Result code returned to the caller.
        result: ResultCode,
    },
    /// A bind was attempted.
    Bind {
        /// DN the client bound as.
        bind_dn: String,
        /// Result code of the bind.
        result: ResultCode,
    },
    /// A search was refused before any lookup ran.
    SearchDenied {
        /// Requested base DN.
        base_dn: String,
        /// Reason for denial.
        reason: String,
    },
    /// A session ended.
    SessionClosed,
}

/// An audit event with metadata.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Unique event ID.
    pub id: [u8; 16],
    /// Timestamp when event occurred (microseconds since epoch).
    pub timestamp: u64,
    /// Name of the backend that emitted the event.
    pub handler: String,
    /// DN the session was bound as (empty for anonymous).
    pub bound_dn: String,
    /// Event details.
    pub event_type: AuditEventType,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(
        handler: impl Into<String>,
        bound_dn: impl Into<String>,
        event_type: AuditEventType,
    ) -> Self {
        Self {
            id: generate_event_id(),
            timestamp: current_timestamp(),
            handler: handler.into(),
            bound_dn: bound_dn.into(),
            event_type,
        }
    }

    /// Create a declined-operation event.
    pub fn declined(
        handler: impl Into<String>,
        bound_dn: impl Into<String>,
        operation: MutationOp,
        target_dn: impl Into<String>,
    ) -> Self {
        Self::new(
            handler,
            bound_dn,
            AuditEventType::OperationDeclined {
                operation,
                target_dn: target_dn.into(),
                result: ResultCode::InsufficientAccessRights,
            },
        )
    }

    /// Create a bind event.
    pub fn bind(
        handler: impl Into<String>,
        bind_dn: impl Into<String>,
        result: ResultCode,
    ) -> Self {
        let bind_dn = bind_dn.into();
        Self::new(
            handler,
            bind_dn.clone(),
            AuditEventType::Bind { bind_dn, result },
        )
    }

    /// Create a search-denied event.
    pub fn search_denied(
        handler: impl Into<String>,
        bound_dn: impl Into<String>,
        base_dn: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            handler,
            bound_dn,
            AuditEventType::SearchDenied {
                base_dn: base_dn.into(),
                reason: reason.into(),
            },
        )
    }

    /// Create a session-closed event.
    pub fn session_closed(handler: impl Into<String>, bound_dn: impl Into<String>) -> Self {
        Self::new(handler, bound_dn, AuditEventType::SessionClosed)
    }

    /// Check whether this event should be reported at error severity.
    pub fn is_error(&self) -> bool {
        matches!(self.event_type, AuditEventType::OperationDeclined { .. })
    }

    /// Format the event as a log line.
    pub fn to_log_line(&self) -> String {
        let id_hex: String = self.id.iter().map(|b| format!("{:02x}", b)).collect();
        let event_desc = match &self.event_type {
            AuditEventType::OperationDeclined {
                operation,
                target_dn,
                result,
            } => format!(
                "DECLINED op={} dn={} result={}",
                operation,
                target_dn,
                result.code()
            ),
            AuditEventType::Bind { bind_dn, result } => {
                if result.is_success() {
                    format!("BIND_OK dn={}", bind_dn)
                } else {
                    format!("BIND_FAILED dn={} result={}", bind_dn, result.code())
                }
            }
            AuditEventType::SearchDenied { base_dn, reason } => {
                format!("SEARCH_DENIED base={} reason={}", base_dn, reason)
            }
            AuditEventType::SessionClosed => "CLOSE".to_string(),
        };

        format!(
            "{} id={} handler={} bound={} {}",
            self.timestamp, id_hex, self.handler, self.bound_dn, event_desc
        )
    }
}

/// Trait for audit log backends.
pub trait AuditLogger: Send + Sync {
    /// Log an audit event.
    fn log(&self, event: AuditEvent);
}

/// Shared audit logger handle.
pub type SharedAuditLogger = Arc<dyn AuditLogger>;

/// In-memory audit logger for testing.
#[derive(Debug, Default)]
pub struct MemoryAuditLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLogger {
    /// Create a new memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all logged events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Clear all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn log(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// No-op audit logger that discards all events.
#[derive(Debug, Default)]
pub struct NullAuditLogger;

impl AuditLogger for NullAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}

/// Audit logger that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        let line = event.to_log_line();
        if event.is_error() {
            tracing::error!(target: "ldapback::audit", handler = %event.handler, "{}", line);
        } else {
            tracing::info!(target: "ldapback::audit", handler = %event.handler, "{}", line);
        }
    }
}
