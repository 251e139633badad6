use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single audit entry: who did what, when, with what detail.
///
/// Records are immutable once built. Fields are only reachable through
/// accessors. Ordering between records is the order in which the logger
/// admitted them, not their timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    timestamp: DateTime<Utc>,
    action: String,
    actor: String,
    details: String,
}

impl AuditRecord {
    /// Build a record stamped with the current UTC time.
    pub fn new(
        action: impl Into<String>,
        actor: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(Utc::now(), action, actor, details)
    }

    /// Build a record with an explicit timestamp.
    ///
    /// The timestamp is truncated to whole microseconds, the precision of
    /// [`timestamp_string`](Self::timestamp_string), so a record read back
    /// from its text form compares equal to the original.
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        action: impl Into<String>,
        actor: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(6),
            action: action.into(),
            actor: actor.into(),
            details: details.into(),
        }
    }

    /// When the record was created by its producer.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Short identifier of the operation performed (e.g. `PlaceMarketOrder`).
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Identifier of the principal that performed the action.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Free-form description, usually the serialized parameters.
    pub fn details(&self) -> &str {
        &self.details
    }

    /// The timestamp as RFC 3339 with microsecond precision and a `Z` suffix.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}
