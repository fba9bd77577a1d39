use kanban_core::KanbanResult;
use kanban_domain::{
    AccessGuard, Board, BoardId, BoardRole, BoardUpdate, Caller, Column, EventKind, Label,
    Member, Operation, ResourceRef, Sprint,
};
use serde::{Deserialize, Serialize};

use super::{fetch, live, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Initial column names; the configured defaults when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl CreateBoard {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            columns: None,
        }
    }
}

/// A board with everything needed to render it.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDetail {
    pub board: Board,
    pub members: Vec<Member>,
    pub columns: Vec<Column>,
    pub labels: Vec<Label>,
    pub sprints: Vec<Sprint>,
}

impl KanbanService {
    /// Any authenticated caller may create a board and becomes its Admin.
    pub async fn create_board(&self, caller: &Caller, request: CreateBoard) -> KanbanResult<Board> {
        let default_columns = &self.config.boards.default_columns;
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authenticate(tables, caller)?;
                let board = Board::new(&request.name, request.description)?;
                let names = request.columns.as_ref().unwrap_or(default_columns);
                let columns = names
                    .iter()
                    .enumerate()
                    .map(|(position, name)| Column::new(board.id, name, position as i32))
                    .collect::<KanbanResult<Vec<_>>>()?;

                batch.add(Member::new(
                    board.id,
                    caller.user_id().to_string(),
                    BoardRole::Admin,
                ));
                for column in columns {
                    batch.add(column);
                }
                let board_id = board.id;
                batch.add(board);
                Ok(board_id)
            })
            .await?;

        let board = fetch(&committed.tables.boards, &committed.value)?;
        tracing::info!(board_id = %board.id, owner = %caller, "board created");
        Ok(board)
    }

    /// Boards the caller is a member of, sorted by name.
    pub async fn list_boards(
        &self,
        caller: &Caller,
        include_archived: bool,
    ) -> KanbanResult<Vec<Board>> {
        let tables = self.db.read().await;
        AccessGuard::authenticate(&*tables, caller)?;

        let mut boards: Vec<Board> = tables
            .members
            .find_all(|m| m.user_id == caller.user_id())
            .filter_map(|m| tables.boards.get(&m.board_id))
            .filter(|b| include_archived || !b.archived)
            .cloned()
            .collect();
        boards.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(boards)
    }

    pub async fn get_board(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<BoardDetail> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;

        let board = live(&tables.boards, &board_id, "board")?;
        let members = tables.board_members(board_id).into_iter().cloned().collect();
        let columns = tables.board_columns(board_id).into_iter().cloned().collect();
        let mut labels: Vec<Label> = tables
            .labels
            .find_all(|l| l.board_id == board_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let mut sprints: Vec<Sprint> = tables
            .sprints
            .find_all(|s| s.board_id == board_id)
            .cloned()
            .collect();
        sprints.sort_by_key(|s| s.audit.created_at);

        Ok(BoardDetail {
            board,
            members,
            columns,
            labels,
            sprints,
        })
    }

    /// Succeeds when the caller may see the board. Used before subscribing
    /// a connection to its events.
    pub async fn ensure_board_access(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<()> {
        self.view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;
        Ok(())
    }

    pub async fn update_board(
        &self,
        caller: &Caller,
        board_id: BoardId,
        updates: BoardUpdate,
    ) -> KanbanResult<Board> {
        self.mutate_board(caller, board_id, Operation::UpdateBoard, EventKind::BoardUpdated, |board| {
            board.update(updates)
        })
        .await
    }

    pub async fn archive_board(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Board> {
        self.mutate_board(caller, board_id, Operation::ArchiveBoard, EventKind::BoardArchived, |board| {
            board.archive();
            Ok(())
        })
        .await
    }

    pub async fn unarchive_board(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Board> {
        self.mutate_board(
            caller,
            board_id,
            Operation::ArchiveBoard,
            EventKind::BoardUnarchived,
            |board| {
                board.unarchive();
                Ok(())
            },
        )
        .await
    }

    /// Soft delete. Everything below the board becomes unreachable with it.
    pub async fn delete_board(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            AccessGuard::authorize(tables, caller, ResourceRef::Board(board_id), Operation::DeleteBoard)?;
            let board = live(&tables.boards, &board_id, "board")?;
            batch
                .remove(board)
                .emit(EventKind::BoardDeleted, board_id, board_id);
            Ok(())
        })
        .await?;
        tracing::info!(%board_id, by = %caller, "board deleted");
        Ok(())
    }

    async fn mutate_board<F>(
        &self,
        caller: &Caller,
        board_id: BoardId,
        operation: Operation,
        kind: EventKind,
        change: F,
    ) -> KanbanResult<Board>
    where
        F: FnOnce(&mut Board) -> KanbanResult<()> + Send,
    {
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(tables, caller, ResourceRef::Board(board_id), operation)?;
                let mut board = live(&tables.boards, &board_id, "board")?;
                change(&mut board)?;
                batch.modify(board).emit(kind, board_id, board_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.boards, &board_id)
    }
}
