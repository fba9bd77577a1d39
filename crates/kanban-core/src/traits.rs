use crate::audit::AuditInfo;
use chrono::{DateTime, Utc};

/// A persisted row that carries audit bookkeeping.
///
/// Soft-deletable records expose their tombstone slot; everything else is
/// physically removed when deleted.
pub trait Record {
    type Key: Ord + Clone + std::fmt::Debug;

    fn key(&self) -> Self::Key;

    fn audit(&self) -> &AuditInfo;

    fn audit_mut(&mut self) -> &mut AuditInfo;

    fn tombstone_mut(&mut self) -> Option<&mut Option<DateTime<Utc>>> {
        None
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
