//! Audit sink for membership and credential events.
//!
//! The core records human-readable messages through this seam instead of a
//! process-global logger. Implementations must not block the caller.

/// Fire-and-forget message sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Emits each message as a `tracing` event under the `gatehouse::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, message: &str) {
        tracing::info!(target: "gatehouse::audit", "{message}");
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _message: &str) {}
}
