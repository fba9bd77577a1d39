use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kanban_core::AppConfig;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.data_file = dir.path().join("kanban.json");
    config.storage.attachments_dir = dir.path().join("attachments");
    let state = kanban_server::build_state(config).await.unwrap();
    (kanban_server::build_router(state), dir)
}

async fn send(app: &Router, user: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_check_needs_no_identity() {
    let (app, _dir) = test_app().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn blank_identity_is_unauthorized() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, "   ", "GET", "/api/boards", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401);
    assert!(body["message"].as_str().unwrap().contains("identity"));
}

#[tokio::test]
async fn errors_use_the_envelope() {
    let (app, _dir) = test_app().await;
    let (_, board) = send(&app, "alice", "POST", "/api/boards", Some(json!({"name": "Roadmap"}))).await;
    let board_uri = format!("/api/boards/{}", board["id"].as_str().unwrap());

    let (status, body) = send(&app, "mallory", "GET", &board_uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status_code"], 403);

    let missing = format!("/api/boards/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "alice", "GET", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn task_flow_over_http() {
    let (app, _dir) = test_app().await;
    let (status, board) = send(
        &app,
        "alice",
        "POST",
        "/api/boards",
        Some(json!({"name": "Roadmap", "columns": ["Backlog", "Done"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let board_id = board["id"].as_str().unwrap().to_string();

    let (_, detail) = send(&app, "alice", "GET", &format!("/api/boards/{}", board_id), None).await;
    assert_eq!(detail["columns"].as_array().unwrap().len(), 2);
    assert_eq!(detail["members"][0]["role"], "Admin");
    let backlog = detail["columns"][0]["id"].as_str().unwrap().to_string();
    let done = detail["columns"][1]["id"].as_str().unwrap().to_string();

    let (status, task) = send(
        &app,
        "alice",
        "POST",
        &format!("/api/boards/{}/tasks", board_id),
        Some(json!({"column_id": backlog, "title": "Write docs", "priority": "High"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["task_number"], 1);
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, moved) = send(
        &app,
        "alice",
        "POST",
        &format!("/api/tasks/{}/move", task_id),
        Some(json!({"column_id": done})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["column_id"], done.as_str());

    let (_, tasks) = send(
        &app,
        "alice",
        "GET",
        &format!("/api/boards/{}/tasks?column_id={}", board_id, done),
        None,
    )
    .await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "alice", "DELETE", &format!("/api/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "alice", "GET", &format!("/api/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attachment_upload_and_download() {
    let (app, _dir) = test_app().await;
    let (_, board) = send(&app, "alice", "POST", "/api/boards", Some(json!({"name": "Roadmap"}))).await;
    let board_id = board["id"].as_str().unwrap();
    let (_, columns) = send(&app, "alice", "GET", &format!("/api/boards/{}/columns", board_id), None).await;
    let (_, task) = send(
        &app,
        "alice",
        "POST",
        &format!("/api/boards/{}/tasks", board_id),
        Some(json!({"column_id": columns[0]["id"], "title": "Design"})),
    )
    .await;

    let req = Request::builder()
        .method("POST")
        .uri(format!(
            "/api/tasks/{}/attachments?file_name=mock.png",
            task["id"].as_str().unwrap()
        ))
        .header("x-user-id", "alice")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![0x89, b'P', b'N', b'G']))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let attachment: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(attachment["size_bytes"], 4);

    let req = Request::builder()
        .uri(format!("/api/attachments/{}", attachment["id"].as_str().unwrap()))
        .header("x-user-id", "alice")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"mock.png\""
    );
    assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn malformed_requests_use_the_envelope() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, "alice", "POST", "/api/boards", Some(json!({"nam": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    assert!(body["message"].as_str().unwrap().contains("name"));

    let (status, body) = send(&app, "alice", "GET", "/api/boards/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let (status, body) = send(
        &app,
        "alice",
        "GET",
        "/api/boards?include_archived=perhaps",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let req = Request::builder()
        .method("POST")
        .uri("/api/boards")
        .header("x-user-id", "alice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "alice", "GET", "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);
}
