use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use kanban_core::KanbanError;
use kanban_domain::{
    AttachmentId, BoardId, BoardRole, BoardUpdate, ColumnId, ColumnUpdate, CommentId, LabelId,
    LabelUpdate, ProfileUpdate, SprintId, SprintUpdate, SubTaskId, SubTaskUpdate, TaskFilter,
    TaskId, TaskUpdate, UserAdminUpdate, UserId,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::hub::BoardHub;
use crate::identity::Identity;
use crate::service::{
    AddMember, AttachmentUpload, CreateBoard, CreateColumn, CreateLabel, CreateSprint,
    CreateTask, KanbanService, MoveTask,
};
use crate::ws;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub service: Arc<KanbanService>,
    pub hub: Arc<BoardHub>,
    pub identity_header: String,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListBoardsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: BoardRole,
}

#[derive(Deserialize)]
pub struct PositionRequest {
    pub position: i32,
}

#[derive(Deserialize)]
pub struct SprintAssignment {
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub body: String,
}

#[derive(Deserialize)]
pub struct SubTaskTitle {
    pub title: String,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

#[derive(Deserialize)]
pub struct WatchTarget {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws::ws_handler))
        .route("/api/me", get(get_profile).put(upsert_profile))
        .route("/api/users", get(list_users))
        .route("/api/users/{user_id}", patch(update_user))
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{board_id}",
            get(get_board).patch(update_board).delete(delete_board),
        )
        .route("/api/boards/{board_id}/archive", post(archive_board))
        .route("/api/boards/{board_id}/unarchive", post(unarchive_board))
        .route(
            "/api/boards/{board_id}/members",
            get(list_members).post(add_member),
        )
        .route(
            "/api/boards/{board_id}/members/{user_id}",
            patch(update_member_role).delete(remove_member),
        )
        .route(
            "/api/boards/{board_id}/columns",
            get(list_columns).post(create_column),
        )
        .route(
            "/api/columns/{column_id}",
            patch(update_column).delete(delete_column),
        )
        .route("/api/columns/{column_id}/position", put(reorder_column))
        .route(
            "/api/boards/{board_id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/api/tasks/{task_id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{task_id}/move", post(move_task))
        .route("/api/tasks/{task_id}/sprint", put(assign_sprint))
        .route(
            "/api/tasks/{task_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/api/comments/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
        .route(
            "/api/tasks/{task_id}/subtasks",
            get(list_subtasks).post(add_subtask),
        )
        .route(
            "/api/subtasks/{subtask_id}",
            patch(update_subtask).delete(delete_subtask),
        )
        .route(
            "/api/tasks/{task_id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route(
            "/api/attachments/{attachment_id}",
            get(download_attachment).delete(delete_attachment),
        )
        .route(
            "/api/tasks/{task_id}/watchers",
            get(list_watchers).post(watch).delete(unwatch),
        )
        .route("/api/tasks/{task_id}/watch", post(toggle_watch))
        .route(
            "/api/boards/{board_id}/sprints",
            get(list_sprints).post(create_sprint),
        )
        .route(
            "/api/sprints/{sprint_id}",
            patch(update_sprint).delete(delete_sprint),
        )
        .route("/api/sprints/{sprint_id}/start", post(start_sprint))
        .route("/api/sprints/{sprint_id}/complete", post(complete_sprint))
        .route(
            "/api/boards/{board_id}/labels",
            get(list_labels).post(create_label),
        )
        .route(
            "/api/labels/{label_id}",
            patch(update_label).delete(delete_label),
        )
        .route(
            "/api/tasks/{task_id}/labels/{label_id}",
            put(add_task_label).delete(remove_task_label),
        )
        .fallback(route_not_found)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn route_not_found() -> ApiError {
    ApiError(KanbanError::not_found("route"))
}

// ── Users ─────────────────────────────────────────────────────────────

async fn get_profile(
    State(state): State<SharedState>,
    Identity(caller): Identity,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_profile(&caller).await?))
}

async fn upsert_profile(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    JsonBody(updates): JsonBody<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.upsert_profile(&caller, updates).await?))
}

async fn list_users(
    State(state): State<SharedState>,
    Identity(caller): Identity,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_users(&caller).await?))
}

async fn update_user(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(user_id): PathParams<String>,
    JsonBody(updates): JsonBody<UserAdminUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_user(&caller, &user_id, updates).await?))
}

// ── Boards and members ────────────────────────────────────────────────

async fn list_boards(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    QueryParams(query): QueryParams<ListBoardsQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .list_boards(&caller, query.include_archived)
            .await?,
    ))
}

async fn create_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    JsonBody(request): JsonBody<CreateBoard>,
) -> ApiResult<impl IntoResponse> {
    let board = state.service.create_board(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_board(&caller, board_id).await?))
}

async fn update_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(updates): JsonBody<BoardUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state.service.update_board(&caller, board_id, updates).await?,
    ))
}

async fn archive_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.archive_board(&caller, board_id).await?))
}

async fn unarchive_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.unarchive_board(&caller, board_id).await?))
}

async fn delete_board(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<StatusCode> {
    state.service.delete_board(&caller, board_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_members(&caller, board_id).await?))
}

async fn add_member(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(request): JsonBody<AddMember>,
) -> ApiResult<impl IntoResponse> {
    let member = state.service.add_member(&caller, board_id, request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member_role(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams((board_id, user_id)): PathParams<(BoardId, String)>,
    JsonBody(request): JsonBody<RoleRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_member_role(&caller, board_id, &user_id, request.role)
            .await?,
    ))
}

async fn remove_member(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams((board_id, user_id)): PathParams<(BoardId, String)>,
) -> ApiResult<StatusCode> {
    state
        .service
        .remove_member(&caller, board_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Columns ───────────────────────────────────────────────────────────

async fn list_columns(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_columns(&caller, board_id).await?))
}

async fn create_column(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(request): JsonBody<CreateColumn>,
) -> ApiResult<impl IntoResponse> {
    let column = state
        .service
        .create_column(&caller, board_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

async fn update_column(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(column_id): PathParams<ColumnId>,
    JsonBody(updates): JsonBody<ColumnUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_column(&caller, column_id, updates)
            .await?,
    ))
}

async fn reorder_column(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(column_id): PathParams<ColumnId>,
    JsonBody(request): JsonBody<PositionRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .reorder_column(&caller, column_id, request.position)
            .await?,
    ))
}

async fn delete_column(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(column_id): PathParams<ColumnId>,
) -> ApiResult<StatusCode> {
    state.service.delete_column(&caller, column_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tasks ─────────────────────────────────────────────────────────────

async fn list_tasks(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    QueryParams(filter): QueryParams<TaskFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state.service.list_tasks(&caller, board_id, filter).await?,
    ))
}

async fn create_task(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(request): JsonBody<CreateTask>,
) -> ApiResult<impl IntoResponse> {
    let task = state.service.create_task(&caller, board_id, request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_task(&caller, task_id).await?))
}

async fn update_task(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    JsonBody(updates): JsonBody<TaskUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state.service.update_task(&caller, task_id, updates).await?,
    ))
}

async fn move_task(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    JsonBody(request): JsonBody<MoveTask>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.move_task(&caller, task_id, request).await?))
}

async fn assign_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    JsonBody(request): JsonBody<SprintAssignment>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .assign_sprint(&caller, task_id, request.sprint_id)
            .await?,
    ))
}

async fn delete_task(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<StatusCode> {
    state.service.delete_task(&caller, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Comments and subtasks ─────────────────────────────────────────────

async fn list_comments(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_comments(&caller, task_id).await?))
}

async fn add_comment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    JsonBody(request): JsonBody<CommentBody>,
) -> ApiResult<impl IntoResponse> {
    let comment = state
        .service
        .add_comment(&caller, task_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(comment_id): PathParams<CommentId>,
    JsonBody(request): JsonBody<CommentBody>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_comment(&caller, comment_id, &request.body)
            .await?,
    ))
}

async fn delete_comment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(comment_id): PathParams<CommentId>,
) -> ApiResult<StatusCode> {
    state.service.delete_comment(&caller, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subtasks(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_subtasks(&caller, task_id).await?))
}

async fn add_subtask(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    JsonBody(request): JsonBody<SubTaskTitle>,
) -> ApiResult<impl IntoResponse> {
    let subtask = state
        .service
        .add_subtask(&caller, task_id, &request.title)
        .await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

async fn update_subtask(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(subtask_id): PathParams<SubTaskId>,
    JsonBody(updates): JsonBody<SubTaskUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_subtask(&caller, subtask_id, updates)
            .await?,
    ))
}

async fn delete_subtask(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(subtask_id): PathParams<SubTaskId>,
) -> ApiResult<StatusCode> {
    state.service.delete_subtask(&caller, subtask_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Attachments ───────────────────────────────────────────────────────

async fn list_attachments(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_attachments(&caller, task_id).await?))
}

async fn upload_attachment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    QueryParams(query): QueryParams<UploadQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = body?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let upload = AttachmentUpload {
        file_name: query.file_name,
        content_type,
        bytes: body.to_vec(),
    };
    let attachment = state
        .service
        .upload_attachment(&caller, task_id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

async fn download_attachment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(attachment_id): PathParams<AttachmentId>,
) -> ApiResult<Response> {
    let download = state
        .service
        .download_attachment(&caller, attachment_id)
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, download.content.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        download.content.bytes,
    )
        .into_response())
}

async fn delete_attachment(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(attachment_id): PathParams<AttachmentId>,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_attachment(&caller, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Watchers ──────────────────────────────────────────────────────────

async fn list_watchers(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_watchers(&caller, task_id).await?))
}

async fn toggle_watch(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.toggle_watch(&caller, task_id).await?))
}

async fn watch(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    QueryParams(target): QueryParams<WatchTarget>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .watch(&caller, task_id, target.user_id)
            .await?,
    ))
}

async fn unwatch(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(task_id): PathParams<TaskId>,
    QueryParams(target): QueryParams<WatchTarget>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .unwatch(&caller, task_id, target.user_id)
            .await?,
    ))
}

// ── Sprints ───────────────────────────────────────────────────────────

async fn list_sprints(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_sprints(&caller, board_id).await?))
}

async fn create_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(request): JsonBody<CreateSprint>,
) -> ApiResult<impl IntoResponse> {
    let sprint = state
        .service
        .create_sprint(&caller, board_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

async fn update_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(sprint_id): PathParams<SprintId>,
    JsonBody(updates): JsonBody<SprintUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_sprint(&caller, sprint_id, updates)
            .await?,
    ))
}

async fn start_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(sprint_id): PathParams<SprintId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.start_sprint(&caller, sprint_id).await?))
}

async fn complete_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(sprint_id): PathParams<SprintId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.complete_sprint(&caller, sprint_id).await?))
}

async fn delete_sprint(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(sprint_id): PathParams<SprintId>,
) -> ApiResult<StatusCode> {
    state.service.delete_sprint(&caller, sprint_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Labels ────────────────────────────────────────────────────────────

async fn list_labels(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_labels(&caller, board_id).await?))
}

async fn create_label(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(board_id): PathParams<BoardId>,
    JsonBody(request): JsonBody<CreateLabel>,
) -> ApiResult<impl IntoResponse> {
    let label = state
        .service
        .create_label(&caller, board_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(label)))
}

async fn update_label(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(label_id): PathParams<LabelId>,
    JsonBody(updates): JsonBody<LabelUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .update_label(&caller, label_id, updates)
            .await?,
    ))
}

async fn delete_label(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams(label_id): PathParams<LabelId>,
) -> ApiResult<StatusCode> {
    state.service.delete_label(&caller, label_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_task_label(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams((task_id, label_id)): PathParams<(TaskId, LabelId)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .add_task_label(&caller, task_id, label_id)
            .await?,
    ))
}

async fn remove_task_label(
    State(state): State<SharedState>,
    Identity(caller): Identity,
    PathParams((task_id, label_id)): PathParams<(TaskId, LabelId)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .service
            .remove_task_label(&caller, task_id, label_id)
            .await?,
    ))
}
