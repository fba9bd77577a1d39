use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::Record;

/// Creator/updater bookkeeping stamped on every persisted record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of stamping a record that was marked for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Row stays in place with its deletion timestamp set.
    Tombstoned,
    /// Row must be physically removed.
    Physical,
}

/// Applies audit bookkeeping for one unit of work.
///
/// Every record touched by the same unit of work receives the same actor and
/// the same timestamp.
#[derive(Debug, Clone)]
pub struct AuditStamper {
    actor: String,
    now: DateTime<Utc>,
}

impl AuditStamper {
    pub fn new(actor: impl Into<String>) -> Self {
        Self::at(actor, Utc::now())
    }

    pub fn at(actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            now,
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn stamp_created<R: Record>(&self, record: &mut R) {
        let audit = record.audit_mut();
        audit.created_by = self.actor.clone();
        audit.created_at = self.now;
        audit.updated_by = None;
        audit.updated_at = None;
    }

    /// `original` is the stored audit block; creation fields never change
    /// after the first write.
    pub fn stamp_modified<R: Record>(&self, record: &mut R, original: &AuditInfo) {
        let audit = record.audit_mut();
        audit.created_by = original.created_by.clone();
        audit.created_at = original.created_at;
        audit.updated_by = Some(self.actor.clone());
        audit.updated_at = Some(self.now);
    }

    pub fn stamp_removed<R: Record>(&self, record: &mut R, original: &AuditInfo) -> Removal {
        match record.tombstone_mut() {
            Some(slot) => *slot = Some(self.now),
            None => return Removal::Physical,
        }
        self.stamp_modified(record, original);
        Removal::Tombstoned
    }
}
