use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, BoardId, Caller, Column, ColumnId, ColumnUpdate, EventKind, Operation,
    ResourceRef,
};
use serde::Deserialize;

use super::{fetch, insert_index, live, renumber, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateColumn {
    pub name: String,
    /// Insert position; appended when absent.
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub wip_limit: Option<u32>,
}

impl KanbanService {
    pub async fn list_columns(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Vec<Column>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;
        Ok(tables.board_columns(board_id).into_iter().cloned().collect())
    }

    pub async fn create_column(
        &self,
        caller: &Caller,
        board_id: BoardId,
        request: CreateColumn,
    ) -> KanbanResult<Column> {
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Board(board_id),
                    Operation::CreateColumn,
                )?;
                let mut columns: Vec<Column> =
                    tables.board_columns(board_id).into_iter().cloned().collect();
                let index = insert_index(request.position, columns.len());

                let mut column = Column::new(board_id, &request.name, index as i32)?;
                column.wip_limit = request.wip_limit;
                let column_id = column.id;

                columns.insert(index, column.clone());
                for shifted in renumber(columns, |c| &mut c.position) {
                    if shifted.id != column_id {
                        batch.modify(shifted);
                    }
                }
                batch
                    .add(column)
                    .emit(EventKind::ColumnCreated, board_id, column_id);
                Ok(column_id)
            })
            .await?;
        fetch(&committed.tables.columns, &committed.value)
    }

    pub async fn update_column(
        &self,
        caller: &Caller,
        column_id: ColumnId,
        updates: ColumnUpdate,
    ) -> KanbanResult<Column> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Column(column_id),
                    Operation::UpdateColumn,
                )?;
                let mut column = live(&tables.columns, &column_id, "column")?;
                column.update(updates)?;
                batch
                    .modify(column)
                    .emit(EventKind::ColumnUpdated, grant.board_id, column_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.columns, &column_id)
    }

    /// Move a column to `position` and return the board's columns in order.
    pub async fn reorder_column(
        &self,
        caller: &Caller,
        column_id: ColumnId,
        position: i32,
    ) -> KanbanResult<Vec<Column>> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Column(column_id),
                    Operation::UpdateColumn,
                )?;
                let mut columns: Vec<Column> = tables
                    .board_columns(grant.board_id)
                    .into_iter()
                    .filter(|c| c.id != column_id)
                    .cloned()
                    .collect();
                let moved = live(&tables.columns, &column_id, "column")?;
                let index = insert_index(Some(position), columns.len());
                columns.insert(index, moved);

                for column in renumber(columns, |c| &mut c.position) {
                    batch.modify(column);
                }
                batch.emit(EventKind::ColumnUpdated, grant.board_id, column_id);
                Ok(grant.board_id)
            })
            .await?;
        Ok(committed
            .tables
            .board_columns(committed.value)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Only empty columns can be deleted; the rest close the gap.
    pub async fn delete_column(&self, caller: &Caller, column_id: ColumnId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::Column(column_id),
                Operation::DeleteColumn,
            )?;
            let task_count = tables.column_tasks(column_id).len();
            if task_count > 0 {
                return Err(KanbanError::BadRequest(format!(
                    "column still contains {} task(s)",
                    task_count
                )));
            }

            let column = live(&tables.columns, &column_id, "column")?;
            let remaining: Vec<Column> = tables
                .board_columns(grant.board_id)
                .into_iter()
                .filter(|c| c.id != column_id)
                .cloned()
                .collect();
            for shifted in renumber(remaining, |c| &mut c.position) {
                batch.modify(shifted);
            }
            batch
                .remove(column)
                .emit(EventKind::ColumnDeleted, grant.board_id, column_id);
            Ok(())
        })
        .await?;
        Ok(())
    }
}
