//! HTTP surface of the synchronization service.
//!
//! Every collection endpoint follows the same full-replace contract: the
//! client GETs a whole sub-collection, edits it locally, and POSTs the whole
//! thing back. There are no partial updates. Two writers racing on the same
//! user are last-write-wins at the store; the clients are expected to be a
//! single person's browser tabs, so this is documented rather than locked.

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::ApiError;
use crate::db::UserRepository;
use crate::models::{UserPatch, UserRecord};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<UserRepository>,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", get(list_users))
        .route("/api/{user}", get(get_user))
        .route(
            "/api/{user}/subjects",
            get(get_subjects).post(replace_subjects),
        )
        .route("/api/{user}/subjects/{id}", delete(delete_subject))
        .route(
            "/api/{user}/dailylogs",
            get(get_dailylogs).post(replace_dailylogs),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// All known user names, in store-insertion order.
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.repo.list_names().await?;
    Ok(Json(names))
}

/// Full user record. First access to any name materializes a blank profile.
async fn get_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    let record = state.repo.get_or_create(&user).await?;
    Ok(Json(record))
}

async fn get_subjects(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let subjects = match state.repo.find_by_name(&user).await? {
        Some(record) => record.subjects,
        None => Vec::new(),
    };
    Ok(Json(subjects))
}

/// Overwrites the user's subjects wholesale, creating the user if absent.
/// Responds with the stored array.
async fn replace_subjects(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(subjects): Json<Vec<Value>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let record = state
        .repo
        .upsert_by_name(&user, UserPatch::subjects(subjects))
        .await?;
    Ok(Json(record.subjects))
}

/// Removes every subject whose id matches, rewriting the whole sequence.
/// 404s if the user was never created; delete does not materialize users.
async fn delete_subject(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let record = state
        .repo
        .find_by_name(&user)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let remaining: Vec<Value> = record
        .subjects
        .into_iter()
        .filter(|subject| !subject_id_matches(subject, &id))
        .collect();

    let record = state
        .repo
        .upsert_by_name(&user, UserPatch::subjects(remaining))
        .await?;
    Ok(Json(record.subjects))
}

async fn get_dailylogs(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let dailylogs = match state.repo.find_by_name(&user).await? {
        Some(record) => record.dailylogs,
        None => Vec::new(),
    };
    Ok(Json(dailylogs))
}

async fn replace_dailylogs(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(dailylogs): Json<Vec<Value>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let record = state
        .repo
        .upsert_by_name(&user, UserPatch::dailylogs(dailylogs))
        .await?;
    Ok(Json(record.dailylogs))
}

/// Whether a subject's `id` field equals the path id, compared both as a
/// string and as an integer. Clients have stored both `"1"` and `1` over
/// time, so a delete for `1` must catch either.
fn subject_id_matches(subject: &Value, id: &str) -> bool {
    match subject.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => id
            .parse::<i64>()
            .ok()
            .is_some_and(|parsed| n.as_i64() == Some(parsed)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::server::seed_known_users;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        repo: Arc<UserRepository>,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_app() -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(db_path).await.unwrap();
        let repo = Arc::new(UserRepository::new(pool));
        let state = AppState { repo: repo.clone() };
        TestApp {
            app: router(state),
            repo,
            _temp_dir: temp_dir,
        }
    }

    async fn request(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let test = setup_app().await;
        let (status, body) = request(&test.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_unknown_user_materializes_blank_record() {
        let test = setup_app().await;

        let (status, body) = request(&test.app, Method::GET, "/api/Priya", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Priya");
        assert_eq!(body["subjects"], json!([]));
        assert_eq!(body["dailylogs"], json!([]));

        // The record now exists, so it shows up in the user list
        let (_, names) = request(&test.app, Method::GET, "/api/users", None).await;
        assert_eq!(names, json!(["Priya"]));
    }

    #[tokio::test]
    async fn test_get_subjects_for_unknown_user_is_empty_not_created() {
        let test = setup_app().await;

        let (status, body) = request(&test.app, Method::GET, "/api/Ghost/subjects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        // Unlike GET /api/{user}, this path does not materialize the record
        let (_, names) = request(&test.app, Method::GET, "/api/users", None).await;
        assert_eq!(names, json!([]));
    }

    #[tokio::test]
    async fn test_replace_subjects_round_trips() {
        let test = setup_app().await;

        let subjects = json!([
            {"id": "s1", "name": "Algorithms", "description": "sorting", "entries": []},
            {"id": 2, "name": "Networks", "entries": [{"note": "OSI layers"}]}
        ]);
        let (status, stored) = request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(subjects.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, subjects);

        let (_, fetched) = request(&test.app, Method::GET, "/api/Deepak/subjects", None).await;
        assert_eq!(fetched, subjects);
    }

    #[tokio::test]
    async fn test_replace_subjects_with_empty_array() {
        let test = setup_app().await;

        request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": "s1"}])),
        )
        .await;
        let (status, stored) = request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, json!([]));
    }

    #[tokio::test]
    async fn test_replace_is_overwrite_not_merge() {
        let test = setup_app().await;

        request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": "a"}, {"id": "b"}])),
        )
        .await;
        let (_, stored) = request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": "c"}])),
        )
        .await;

        assert_eq!(stored, json!([{"id": "c"}]));
    }

    #[tokio::test]
    async fn test_delete_subject_matches_string_and_numeric_ids() {
        let test = setup_app().await;

        request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": 1, "name": "gone"}, {"id": "1", "name": "also gone"}, {"id": "2", "name": "kept"}])),
        )
        .await;

        let (status, remaining) = request(
            &test.app,
            Method::DELETE,
            "/api/Deepak/subjects/1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(remaining, json!([{"id": "2", "name": "kept"}]));
    }

    #[tokio::test]
    async fn test_delete_subject_preserves_order_of_survivors() {
        let test = setup_app().await;

        request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": "a"}, {"id": "x"}, {"id": "b"}, {"id": "c"}])),
        )
        .await;

        let (_, remaining) = request(
            &test.app,
            Method::DELETE,
            "/api/Deepak/subjects/x",
            None,
        )
        .await;
        assert_eq!(remaining, json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]));
    }

    #[tokio::test]
    async fn test_delete_subject_for_unknown_user_is_404() {
        let test = setup_app().await;

        let (status, body) = request(
            &test.app,
            Method::DELETE,
            "/api/Ghost/subjects/x",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn test_dailylogs_full_replace_contract() {
        let test = setup_app().await;

        let logs = json!([{
            "id": "1",
            "date": "2024-01-01",
            "logs": vec![""; 24]
        }]);
        let (status, stored) = request(
            &test.app,
            Method::POST,
            "/api/Deepak/dailylogs",
            Some(logs.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, logs);

        let (_, fetched) = request(&test.app, Method::GET, "/api/Deepak/dailylogs", None).await;
        assert_eq!(fetched, logs);
    }

    #[tokio::test]
    async fn test_subjects_and_dailylogs_replaced_independently() {
        let test = setup_app().await;

        request(
            &test.app,
            Method::POST,
            "/api/Deepak/subjects",
            Some(json!([{"id": "s1"}])),
        )
        .await;
        request(
            &test.app,
            Method::POST,
            "/api/Deepak/dailylogs",
            Some(json!([{"id": "d1", "date": "2024-01-01"}])),
        )
        .await;

        let (_, subjects) = request(&test.app, Method::GET, "/api/Deepak/subjects", None).await;
        let (_, logs) = request(&test.app, Method::GET, "/api/Deepak/dailylogs", None).await;
        assert_eq!(subjects, json!([{"id": "s1"}]));
        assert_eq!(logs, json!([{"id": "d1", "date": "2024-01-01"}]));
    }

    #[tokio::test]
    async fn test_seeded_scenario() {
        let test = setup_app().await;
        seed_known_users(&test.repo).await.unwrap();

        let (_, names) = request(&test.app, Method::GET, "/api/users", None).await;
        assert_eq!(names, json!(["Deepak", "Anjali"]));

        let (_, subjects) = request(&test.app, Method::GET, "/api/Deepak/subjects", None).await;
        assert_eq!(subjects[0]["name"], "Data Structures");
        assert_eq!(subjects.as_array().unwrap().len(), 1);

        let logs = json!([{"id": "1", "date": "2024-01-01", "logs": vec![""; 24]}]);
        request(
            &test.app,
            Method::POST,
            "/api/Deepak/dailylogs",
            Some(logs.clone()),
        )
        .await;
        let (_, fetched) = request(&test.app, Method::GET, "/api/Deepak/dailylogs", None).await;
        assert_eq!(fetched, logs);
    }

    #[test]
    fn test_subject_id_matches_string_and_numeric() {
        assert!(subject_id_matches(&json!({"id": "7"}), "7"));
        assert!(subject_id_matches(&json!({"id": 7}), "7"));
        assert!(!subject_id_matches(&json!({"id": "7"}), "8"));
        assert!(!subject_id_matches(&json!({"id": 70}), "7"));
        assert!(!subject_id_matches(&json!({"name": "no id"}), "7"));
        // A non-numeric path id can only match a string id
        assert!(subject_id_matches(&json!({"id": "abc"}), "abc"));
        assert!(!subject_id_matches(&json!({"id": 1}), "abc"));
    }
}
