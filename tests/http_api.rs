use app_hub::http::{router, HubState};
use app_hub::kanban::FileTasksStore;
use app_hub::notes::FileNotesStore;
use app_hub::registry::AppRegistry;
use app_hub::store::Stores;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

struct Hub {
    _dir: tempfile::TempDir,
    app: Router,
    registry: Arc<AppRegistry>,
}

fn hub(with_notes: bool) -> Hub {
    let dir = tempfile::tempdir().expect("tempdir");
    let apps = dir.path().join("tiny_Apps");
    let calc = apps.join("calc");
    fs::create_dir_all(calc.join("css")).expect("calc dir");
    fs::write(calc.join("index.html"), "<html><head><title>Calc</title></head><body></body></html>")
        .expect("calc index");
    fs::write(calc.join("css").join("site.css"), "body { margin: 0; }").expect("calc css");
    fs::write(calc.join("NOTES"), "plain").expect("calc extensionless file");
    fs::write(calc.join("app-metadata.json"), r#"{"title":"Calculator","tags":["math"]}"#)
        .expect("calc metadata");
    fs::create_dir_all(apps.join("latin")).expect("latin dir");
    fs::write(apps.join("latin").join("index.html"), b"<head></head><p>Caf\xe9</p>").expect("latin index");
    fs::create_dir_all(apps.join("empty")).expect("empty dir");
    fs::write(apps.join("secret.txt"), "top secret").expect("secret");
    fs::write(dir.path().join("index.html"), "<h1>hub</h1>").expect("hub index");

    let stores = with_notes.then(|| Stores {
        notes: Arc::new(FileNotesStore::open(&dir.path().join("notes.json")).expect("notes")),
        tasks: Arc::new(FileTasksStore::open(&dir.path().join("kanban.json")).expect("kanban")),
    });

    let registry = Arc::new(AppRegistry::new(&apps));
    registry.rescan().expect("rescan");
    let app = router(HubState {
        registry: Arc::clone(&registry),
        stores,
        static_dir: dir.path().to_path_buf(),
    });
    Hub { _dir: dir, app, registry }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Option<String>, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map(|text| Body::from(text.to_string())).unwrap_or_else(Body::empty))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, content_type, bytes.to_vec())
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn apps_listing_rescans_the_root() {
    let hub = hub(true);
    let (status, _, body) = send(&hub.app, Method::GET, "/api/apps", None).await;
    assert_eq!(status, StatusCode::OK);
    let apps = json(&body);
    let apps = apps.as_array().expect("array");
    assert_eq!(apps.len(), 2);
    let calc = apps.iter().find(|app| app["name"] == "calc").expect("calc listed");
    assert_eq!(calc["title"], "Calculator");
    assert_eq!(calc["tags"][0], "math");

    fs::write(hub.registry.root().join("empty").join("index.html"), "<p>now an app</p>").expect("index");
    let (_, _, body) = send(&hub.app, Method::GET, "/api/apps", None).await;
    assert_eq!(json(&body).as_array().expect("array").len(), 3);
}

#[tokio::test]
async fn visiting_an_app_serves_rewritten_entry_and_counts() {
    let hub = hub(true);
    let (status, content_type, body) = send(&hub.app, Method::GET, "/app/calc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.expect("content type").starts_with("text/html"));
    let html = String::from_utf8(body).expect("utf8");
    assert!(html.contains("<head>\n    <base href=\"/app/calc/\"><title>"));

    let calc = hub.registry.get("calc").expect("get").expect("calc");
    assert_eq!(calc.visit_count, 1);

    let (status, _, _) = send(&hub.app, Method::GET, "/app/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&hub.app, Method::GET, "/app/calc/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).expect("utf8").contains("<base href=\"/app/calc/\">"));
    assert_eq!(hub.registry.get("calc").expect("get").expect("calc").visit_count, 2);
}

#[tokio::test]
async fn non_utf8_entry_documents_are_served_as_is() {
    let hub = hub(true);
    let (status, content_type, body) = send(&hub.app, Method::GET, "/app/latin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, b"<head>\n    <base href=\"/app/latin/\"></head><p>Caf\xe9</p>".to_vec());
}

#[tokio::test]
async fn static_assets_are_typed_and_contained() {
    let hub = hub(true);
    let (status, content_type, body) = send(&hub.app, Method::GET, "/app/calc/css/site.css", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/css"));
    assert_eq!(body, b"body { margin: 0; }");

    let (status, content_type, _) = send(&hub.app, Method::GET, "/app/calc/NOTES", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_none());

    let (status, _, _) = send(&hub.app, Method::GET, "/app/calc/css/../../secret.txt", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&hub.app, Method::GET, "/app/calc/missing.js", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&hub.app, Method::GET, "/app/ghost/style.css", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hub_index_is_served_from_static_dir() {
    let hub = hub(true);
    let (status, content_type, body) = send(&hub.app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, b"<h1>hub</h1>");

    let (status, _, _) = send(&hub.app, Method::GET, "/style.css", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notes_crud_round_trip() {
    let hub = hub(true);

    let (status, _, body) = send(
        &hub.app,
        Method::POST,
        "/api/notes",
        Some(r#"{"note_title":"Groceries","note_content":"milk, eggs"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json(&body);
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["created_at"], created["updated_at"]);

    let (status, _, body) = send(
        &hub.app,
        Method::PUT,
        &format!("/api/notes/{id}"),
        Some(r#"{"title":"Groceries","content":"milk, eggs, bread"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["note_content"], "milk, eggs, bread");

    let (status, _, body) = send(&hub.app, Method::GET, &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["note_content"], "milk, eggs, bread");

    let (_, _, body) = send(&hub.app, Method::GET, "/api/notes", None).await;
    assert_eq!(json(&body).as_array().expect("array").len(), 1);
    let (status, _, body) = send(&hub.app, Method::GET, "/api/notes/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().expect("array").len(), 1);

    let (status, _, _) = send(&hub.app, Method::DELETE, &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&hub.app, Method::DELETE, &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json(&body)["error"].as_str().expect("message").contains("not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_note_writes_run_off_the_async_workers() {
    let hub = hub(true);
    let handles: Vec<_> = (0..8)
        .map(|index| {
            let app = hub.app.clone();
            tokio::spawn(async move {
                let body = format!(r#"{{"note_title":"note {index}","note_content":"body"}}"#);
                send(&app, Method::POST, "/api/notes", Some(body.as_str())).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let (status, _, body) = handle.await.expect("task");
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json(&body)["id"].as_i64().expect("id"));
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn notes_reject_bad_input() {
    let hub = hub(true);

    let (status, _, _) = send(&hub.app, Method::POST, "/api/notes", Some("{ nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &hub.app,
        Method::POST,
        "/api/notes",
        Some(r#"{"note_title":"   ","note_content":"body"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Title and content are required");

    let (status, _, body) = send(&hub.app, Method::GET, "/api/notes/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Invalid note ID");

    let (status, _, _) = send(
        &hub.app,
        Method::PUT,
        "/api/notes/7",
        Some(r#"{"note_title":"t","note_content":"c"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notes_report_unavailable_without_backend() {
    let hub = hub(false);
    for (method, uri) in [
        (Method::GET, "/api/notes"),
        (Method::DELETE, "/api/notes/1"),
        (Method::GET, "/api/kanban"),
        (Method::GET, "/api/database/tables"),
    ] {
        let (status, _, _) = send(&hub.app, method, uri, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    let (status, _, _) = send(&hub.app, Method::GET, "/api/apps", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn kanban_tasks_round_trip_with_defaults() {
    let hub = hub(true);

    let (status, _, body) = send(&hub.app, Method::POST, "/api/kanban", Some(r#"{"title":"Ship v1"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    let task = json(&body);
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["description"], "");
    let id = task["id"].as_i64().expect("id");

    let (status, _, body) = send(
        &hub.app,
        Method::PUT,
        &format!("/api/kanban/{id}"),
        Some(r#"{"title":"Ship v1","status":"done","priority":"high"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "done");

    let (_, _, body) = send(&hub.app, Method::GET, "/api/kanban", None).await;
    assert_eq!(json(&body)[0]["priority"], "high");

    let (status, _, body) = send(&hub.app, Method::DELETE, &format!("/api/kanban/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Task deleted successfully");

    let (status, _, _) = send(&hub.app, Method::DELETE, &format!("/api/kanban/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn kanban_rejects_bad_input() {
    let hub = hub(true);

    let (status, _, body) = send(&hub.app, Method::POST, "/api/kanban", Some(r#"{"description":"no title"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Title is required");

    let (status, _, body) = send(&hub.app, Method::PUT, "/api/kanban/x", Some(r#"{"title":"t"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Invalid task ID");

    let (status, _, _) = send(&hub.app, Method::PUT, "/api/kanban/4", Some(r#"{"title":"t"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn database_viewer_lists_tables_and_rows() {
    let hub = hub(true);
    send(&hub.app, Method::POST, "/api/notes", Some(r#"{"note_title":"a","note_content":"b"}"#)).await;
    send(&hub.app, Method::POST, "/api/kanban", Some(r#"{"title":"Ship"}"#)).await;
    send(&hub.app, Method::POST, "/api/kanban", Some(r#"{"title":"Test"}"#)).await;

    let (status, _, body) = send(&hub.app, Method::GET, "/api/database/tables", None).await;
    assert_eq!(status, StatusCode::OK);
    let tables = json(&body);
    assert_eq!(tables[0]["table_name"], "notes_records");
    assert_eq!(tables[0]["row_count"], 1);
    assert_eq!(tables[1]["table_name"], "kanban_tasks");
    assert_eq!(tables[1]["row_count"], 2);

    let (_, _, body) = send(&hub.app, Method::GET, "/api/database/tables/kanban_tasks", None).await;
    assert_eq!(json(&body)[1]["title"], "Test");

    let (status, _, body) = send(&hub.app, Method::GET, "/api/database/tables/unknown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&body).as_array().expect("array").is_empty());
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let hub = hub(true);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/notes")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("request");

    let response = hub.app.clone().oneshot(request).await.expect("response");
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[test]
fn registry_root_is_absolute() {
    let registry = AppRegistry::new(Path::new("relative/apps"));
    assert!(registry.root().is_absolute());
}
