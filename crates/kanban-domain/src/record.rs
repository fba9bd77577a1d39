/// Implements `kanban_core::Record` for an entity with `id` and `audit`
/// fields. The `soft_delete` form also wires the `deleted_at` tombstone.
macro_rules! audited_record {
    ($entity:ty, $key:ty) => {
        impl kanban_core::Record for $entity {
            type Key = $key;

            fn key(&self) -> $key {
                self.id.clone()
            }

            fn audit(&self) -> &kanban_core::AuditInfo {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut kanban_core::AuditInfo {
                &mut self.audit
            }
        }
    };
    ($entity:ty, $key:ty, soft_delete) => {
        impl kanban_core::Record for $entity {
            type Key = $key;

            fn key(&self) -> $key {
                self.id.clone()
            }

            fn audit(&self) -> &kanban_core::AuditInfo {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut kanban_core::AuditInfo {
                &mut self.audit
            }

            fn tombstone_mut(
                &mut self,
            ) -> Option<&mut Option<chrono::DateTime<chrono::Utc>>> {
                Some(&mut self.deleted_at)
            }

            fn deleted_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                self.deleted_at
            }
        }
    };
}
