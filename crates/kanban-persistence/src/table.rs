use kanban_core::{AuditStamper, KanbanError, KanbanResult, Record, Removal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::unit_of_work::ChangeKind;

/// Keyed collection of one record type.
///
/// All reads exclude tombstoned rows. [`Table::get_including_deleted`] is the
/// only way to see them.
#[derive(Debug, Clone)]
pub struct Table<R: Record> {
    rows: BTreeMap<R::Key, R>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key).filter(|row| !row.is_deleted())
    }

    pub fn get_including_deleted(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &R::Key) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.values().filter(|row| !row.is_deleted())
    }

    /// Live rows matching `predicate`.
    pub fn find_all<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a R> + 'a
    where
        P: FnMut(&R) -> bool + 'a,
    {
        self.iter().filter(move |row| predicate(row))
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<&R>
    where
        P: FnMut(&R) -> bool,
    {
        self.iter().find(|row| predicate(row))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stamp and store one change. Modifying or removing a row that is
    /// missing or tombstoned fails with NotFound.
    pub(crate) fn apply(
        &mut self,
        kind: ChangeKind,
        mut record: R,
        stamper: &AuditStamper,
    ) -> KanbanResult<()> {
        let key = record.key();
        match kind {
            ChangeKind::Added => {
                if self.rows.contains_key(&key) {
                    return Err(KanbanError::Conflict(format!(
                        "record {:?} already exists",
                        key
                    )));
                }
                stamper.stamp_created(&mut record);
                self.rows.insert(key, record);
            }
            ChangeKind::Modified => {
                let original = self.live_audit(&key)?;
                stamper.stamp_modified(&mut record, &original);
                self.rows.insert(key, record);
            }
            ChangeKind::Removed => {
                let original = self.live_audit(&key)?;
                match stamper.stamp_removed(&mut record, &original) {
                    Removal::Tombstoned => {
                        self.rows.insert(key, record);
                    }
                    Removal::Physical => {
                        self.rows.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    /// Physically drop every row matching `predicate`, tombstoned or not.
    pub(crate) fn purge<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&R) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|_, row| !predicate(row));
        before - self.rows.len()
    }

    fn live_audit(&self, key: &R::Key) -> KanbanResult<kanban_core::AuditInfo> {
        self.get(key)
            .map(|row| row.audit().clone())
            .ok_or_else(|| KanbanError::NotFound(format!("record {:?}", key)))
    }
}

impl<R: Record + Serialize> Serialize for Table<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.values())
    }
}

impl<'de, R: Record + DeserializeOwned> Deserialize<'de> for Table<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<R>::deserialize(deserializer)?;
        Ok(Self {
            rows: rows.into_iter().map(|row| (row.key(), row)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_domain::{Board, Comment};
    use uuid::Uuid;

    fn stamper(actor: &str) -> AuditStamper {
        AuditStamper::new(actor)
    }

    #[test]
    fn test_tombstoned_rows_are_hidden() {
        let mut boards: Table<Board> = Table::default();
        let board = Board::new("Board", None).unwrap();
        let id = board.id;
        boards
            .apply(ChangeKind::Added, board.clone(), &stamper("alice"))
            .unwrap();
        boards
            .apply(ChangeKind::Removed, board, &stamper("alice"))
            .unwrap();

        assert!(boards.get(&id).is_none());
        assert_eq!(boards.iter().count(), 0);
        assert!(boards.is_empty());
        let tombstone = boards.get_including_deleted(&id).unwrap();
        assert!(tombstone.deleted_at.is_some());
        assert_eq!(tombstone.audit.created_by, "alice");
    }

    #[test]
    fn test_hard_delete_removes_row() {
        let mut comments: Table<Comment> = Table::default();
        let comment = Comment::new(Uuid::new_v4(), "alice".into(), "hi").unwrap();
        let id = comment.id;
        comments
            .apply(ChangeKind::Added, comment.clone(), &stamper("alice"))
            .unwrap();
        comments
            .apply(ChangeKind::Removed, comment, &stamper("alice"))
            .unwrap();

        assert!(comments.get_including_deleted(&id).is_none());
    }

    #[test]
    fn test_modify_tombstoned_row_is_not_found() {
        let mut boards: Table<Board> = Table::default();
        let board = Board::new("Board", None).unwrap();
        boards
            .apply(ChangeKind::Added, board.clone(), &stamper("alice"))
            .unwrap();
        boards
            .apply(ChangeKind::Removed, board.clone(), &stamper("alice"))
            .unwrap();

        let err = boards
            .apply(ChangeKind::Modified, board, &stamper("bob"))
            .unwrap_err();
        assert!(matches!(err, KanbanError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_add_conflicts() {
        let mut boards: Table<Board> = Table::default();
        let board = Board::new("Board", None).unwrap();
        boards
            .apply(ChangeKind::Added, board.clone(), &stamper("alice"))
            .unwrap();
        let err = boards
            .apply(ChangeKind::Added, board, &stamper("alice"))
            .unwrap_err();
        assert!(matches!(err, KanbanError::Conflict(_)));
    }

    #[test]
    fn test_serializes_as_list_including_tombstones() {
        let mut boards: Table<Board> = Table::default();
        let live = Board::new("Live", None).unwrap();
        let dead = Board::new("Dead", None).unwrap();
        boards
            .apply(ChangeKind::Added, live, &stamper("alice"))
            .unwrap();
        boards
            .apply(ChangeKind::Added, dead.clone(), &stamper("alice"))
            .unwrap();
        boards
            .apply(ChangeKind::Removed, dead, &stamper("alice"))
            .unwrap();

        let json = serde_json::to_value(&boards).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);

        let restored: Table<Board> = serde_json::from_value(json).unwrap();
        assert_eq!(restored.len(), 1);
    }
}
