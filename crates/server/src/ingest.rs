//! Newline-delimited JSON intake.
//!
//! Each non-blank line is one event from a request handler:
//!
//! ```json
//! {"action": "PlaceMarketOrder", "actor": "key-1", "details": "pair=XBTZAR type=BUY"}
//! ```
//!
//! Malformed lines, including lines that are not valid UTF-8, are logged and
//! skipped. Intake ends at end of input or
//! once the audit logger refuses admissions.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use luno_audit::{AuditError, AuditLog};

use crate::error::ServerError;

/// One audit event as submitted on the wire.
#[derive(Debug, Deserialize)]
pub struct IngestEvent {
    /// Operation performed.
    pub action: String,
    /// Principal that performed it.
    pub actor: String,
    /// Free-form details.
    #[serde(default)]
    pub details: String,
}

/// Counts reported when intake finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events handed to the audit log.
    pub accepted: u64,
    /// Lines that could not be parsed.
    pub skipped: u64,
    /// Whether intake stopped because the audit log was closed.
    pub closed: bool,
}

/// Read events from `reader` until EOF and hand each one to `audit`.
pub async fn run<R>(reader: R, audit: &dyn AuditLog) -> Result<IngestSummary, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.split(b'\n');
    let mut line_no = 0u64;

    while let Some(raw) = lines.next_segment().await? {
        line_no += 1;
        let Ok(line) = std::str::from_utf8(&raw) else {
            warn!(line = line_no, "skipping audit event that is not valid UTF-8");
            summary.skipped += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: IngestEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed audit event");
                summary.skipped += 1;
                continue;
            }
        };

        match audit.log(&event.action, &event.actor, &event.details).await {
            Ok(()) => {
                debug!(action = %event.action, "audit event queued");
                summary.accepted += 1;
            }
            Err(AuditError::Closed) => {
                warn!(line = line_no, "audit log closed, ending intake");
                summary.closed = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}
