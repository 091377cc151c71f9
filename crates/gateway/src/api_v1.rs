//! HTTP API v1: profile registry and task lifecycle.
//!
//! Endpoints:
//!
//! - `GET    /v1/profiles`            : list registered profiles
//! - `GET    /v1/profiles/{id}`       : look up one profile
//! - `POST   /v1/tasks`               : submit a task for routing
//! - `GET    /v1/tasks`               : list task snapshots
//! - `GET    /v1/tasks/{id}`          : query a task
//! - `POST   /v1/tasks/{id}/advance`  : move the handoff one phase forward
//! - `POST   /v1/tasks/{id}/supply`   : provide contract items
//! - `POST   /v1/tasks/{id}/rework`   : submit a task superseding `{id}`
//! - `DELETE /v1/tasks/{id}`          : cancel a task

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use switchyard_core::{Error, Profile, TaskId, TaskRequest};
use switchyard_handoff::{Advance, Dispatcher, Submission, TaskSnapshot};

pub type SharedApiState = Arc<Dispatcher>;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/profiles", get(list_profiles_handler))
        .route("/profiles/{id}", get(get_profile_handler))
        .route("/tasks", post(submit_task_handler).get(list_tasks_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler).delete(cancel_task_handler),
        )
        .route("/tasks/{id}/advance", post(advance_task_handler))
        .route("/tasks/{id}/supply", post(supply_task_handler))
        .route("/tasks/{id}/rework", post(rework_task_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub description: String,
    /// Domain tags or profile ids that override classification.
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub supersedes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SupplyRequest {
    pub items: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReworkRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<Profile>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind, e.g. `stale_transition`.
    pub kind: String,
    pub error: String,
}

/// An engine error rendered as a JSON response.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(error = %self.0, "v1 request failed");
        }
        let body = ErrorResponse {
            kind: self.0.kind().to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::AmbiguousRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Conflict { .. }
        | Error::StaleTransition { .. }
        | Error::ContractUnsatisfied { .. } => StatusCode::CONFLICT,
        Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn list_profiles_handler(State(state): State<SharedApiState>) -> Json<ProfileListResponse> {
    let profiles: Vec<Profile> = state
        .registry()
        .all()
        .iter()
        .map(|p| p.as_ref().clone())
        .collect();
    Json(ProfileListResponse {
        count: profiles.len(),
        profiles,
    })
}

async fn get_profile_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.registry().lookup(&id)?;
    Ok(Json(profile.as_ref().clone()))
}

async fn submit_task_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    let mut request = TaskRequest::new(payload.description).with_hints(payload.hints);
    if let Some(prior) = payload.supersedes {
        request = request.superseding(TaskId(prior));
    }
    let submission = state.submit(request)?;
    info!(task_id = %submission.task_id, "v1/tasks submitted");
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn list_tasks_handler(State(state): State<SharedApiState>) -> Json<TaskListResponse> {
    let tasks = state.list();
    Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    })
}

async fn get_task_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<TaskSnapshot>, ApiError> {
    Ok(Json(state.query(&TaskId(id))?))
}

async fn advance_task_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    payload: Option<Json<AdvanceRequest>>,
) -> Result<Json<Advance>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(state.advance(&TaskId(id), payload.expected_version)?))
}

async fn supply_task_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<SupplyRequest>,
) -> Result<Json<TaskSnapshot>, ApiError> {
    Ok(Json(state.supply(&TaskId(id), &payload.items)?))
}

async fn rework_task_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    payload: Option<Json<ReworkRequest>>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let submission = state.rework(&TaskId(id), payload.description)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn cancel_task_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<TaskSnapshot>, ApiError> {
    Ok(Json(state.cancel(&TaskId(id))?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use switchyard_config::AppConfig;
    use tower::ServiceExt;

    fn test_api_state() -> SharedApiState {
        Arc::new(Dispatcher::from_config(&AppConfig::default()).unwrap())
    }

    async fn send(
        state: &SharedApiState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn list_profiles_preserves_registry_order() {
        let state = test_api_state();
        let (status, body) = send(&state, "GET", "/profiles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["profiles"][0]["id"], "backend");
        assert_eq!(body["profiles"][1]["id"], "frontend");
    }

    #[tokio::test]
    async fn get_profile_not_found() {
        let state = test_api_state();
        let (status, body) = send(&state, "GET", "/profiles/mobile", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn submit_single_profile_task() {
        let state = test_api_state();
        let (status, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "design the user table and API" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["composition"]["profiles"][0]["profile_id"], "backend");
        assert!(body.get("handoff").is_none());

        let id = body["task_id"].as_str().unwrap().to_string();
        let (status, snapshot) = send(&state, "GET", &format!("/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["phase"], "intake");
        assert_eq!(snapshot["status"], "open");
    }

    #[tokio::test]
    async fn multi_profile_task_reports_conflict_and_handoff() {
        let state = test_api_state();
        let (status, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "connect the api to the new ui" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["handoff"]["phase"], "intake");

        let id = body["task_id"].as_str().unwrap().to_string();
        let (_, snapshot) = send(&state, "GET", &format!("/tasks/{id}"), None).await;
        let conditions = snapshot["conditions"].as_array().unwrap();
        assert!(
            conditions
                .iter()
                .any(|c| c["type"] == "conflict" && c["category"] == "api_style")
        );
    }

    #[tokio::test]
    async fn ambiguous_request_is_unprocessable() {
        let state = test_api_state();
        let (status, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "water the plants" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "ambiguous_request");
    }

    #[tokio::test]
    async fn stale_advance_is_conflict() {
        let state = test_api_state();
        let (_, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "add a database endpoint" })),
        )
        .await;
        let id = body["task_id"].as_str().unwrap().to_string();
        let uri = format!("/tasks/{id}/advance");

        let expected = Some(json!({ "expected_version": 0 }));
        let (status, moved) = send(&state, "POST", &uri, expected.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["outcome"], "moved");
        assert_eq!(moved["to"], "analysis");

        let (status, body) = send(&state, "POST", &uri, expected).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "stale_transition");
    }

    #[tokio::test]
    async fn cancel_then_advance_is_conflict() {
        let state = test_api_state();
        let (_, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "style the page layout" })),
        )
        .await;
        let id = body["task_id"].as_str().unwrap().to_string();

        let (status, snapshot) = send(&state, "DELETE", &format!("/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["status"], "cancelled");

        let uri = format!("/tasks/{id}/advance");
        let (status, _) = send(&state, "POST", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rework_supersedes_prior_task() {
        let state = test_api_state();
        let (_, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "add a database endpoint" })),
        )
        .await;
        let id = body["task_id"].as_str().unwrap().to_string();

        let uri = format!("/tasks/{id}/rework");
        let (status, rework) = send(&state, "POST", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rework["supersedes"], id.as_str());
        assert_ne!(rework["task_id"], id.as_str());

        let (_, list) = send(&state, "GET", "/tasks", None).await;
        assert_eq!(list["count"], 2);
    }

    #[tokio::test]
    async fn advance_and_rework_accept_an_empty_body() {
        let state = test_api_state();
        let (_, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "add a database endpoint" })),
        )
        .await;
        let id = body["task_id"].as_str().unwrap().to_string();

        let uri = format!("/tasks/{id}/advance");
        let (status, moved) = send(&state, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["to"], "analysis");
        let (_, snapshot) = send(&state, "GET", &format!("/tasks/{id}"), None).await;
        assert_eq!(snapshot["phase"], "analysis");

        let uri = format!("/tasks/{id}/rework");
        let (status, rework) = send(&state, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rework["supersedes"], id.as_str());
    }

    #[tokio::test]
    async fn supply_with_no_items_is_bad_request() {
        let state = test_api_state();
        let (_, body) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "description": "connect the api to the new ui" })),
        )
        .await;
        let id = body["task_id"].as_str().unwrap().to_string();
        let (status, body) = send(
            &state,
            "POST",
            &format!("/tasks/{id}/supply"),
            Some(json!({ "items": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_for(&Error::validation("x", "bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&Error::task_not_found("t")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::Conflict {
                category: "runtime".into(),
                candidates: vec!["rust".into(), "go".into()],
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&Error::StaleTransition {
                task_id: "t".into(),
                expected: 1,
                actual: 2,
            }),
            StatusCode::CONFLICT
        );
    }
}
