//! Progress Endpoints
//!
//! 본인 풀이 상태 조회 / 저장. restricted 시트는 접근 권한이 있어야 함.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Caller,
    error::ApiError,
    routes::ApiJson,
    services::progress,
    types::{parse_id, ProblemStatus},
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// 문제 id → 상태
    pub statuses: HashMap<Uuid, ProblemStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `Unopened` | `Tried` | `Done`
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub status: ProblemStatus,
}

// ============ Handlers ============

/// GET /progress/:sheetId
pub async fn get_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(sheet_id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let statuses =
        progress::statuses(state.store.as_ref(), caller.uid(), &caller.viewer, sheet_id).await?;
    Ok(Json(ProgressResponse { statuses }))
}

/// PUT /progress/:sheetId/:problemId
///
/// 같은 상태를 다시 저장해도 시각은 갱신됨
pub async fn set_status(
    State(state): State<AppState>,
    caller: Caller,
    Path((sheet_id, problem_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let problem_id = parse_id(&problem_id, "Problem")?;

    let status = progress::set_status(
        state.store.as_ref(),
        caller.uid(),
        &caller.viewer,
        sheet_id,
        problem_id,
        &req.status,
        chrono::Utc::now(),
    )
    .await?;

    Ok(Json(StatusResponse { ok: true, status }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::db::memory::{self, MemoryStore};
    use crate::db::{NewProblem, Store as _};
    use crate::routes::testing;
    use crate::services::identity::StaticIdentity;
    use crate::types::Visibility;

    async fn store_with_problem() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        store.put_user(memory::user("u1", "u1@club.org"));
        let sheet = store.insert_sheet("Green Sheet", Visibility::Public).await.unwrap();
        let problem = store
            .insert_problem(NewProblem {
                sheet_id: sheet.id,
                title: "Hello World".into(),
                platform: "BeeCrowd".into(),
                link: "https://judge.beecrowd.com/en/problems/view/1000".into(),
                created_by_uid: None,
            })
            .await
            .unwrap();
        (store, sheet.id, problem.id)
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let (store, sheet_id, problem_id) = store_with_problem().await;
        let state = testing::state(store);

        for _ in 0..2 {
            let caller = testing::caller(&state, "u1").await;
            let Json(resp) = set_status(
                State(state.clone()),
                caller,
                Path((sheet_id.to_string(), problem_id.to_string())),
                ApiJson(StatusRequest { status: "Done".into() }),
            )
            .await
            .unwrap();
            assert_eq!(resp.status, ProblemStatus::Done);
        }

        let caller = testing::caller(&state, "u1").await;
        let Json(resp) = get_progress(State(state), caller, Path(sheet_id.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.statuses.len(), 1);
        assert_eq!(resp.statuses[&problem_id], ProblemStatus::Done);
    }

    #[tokio::test]
    async fn test_unparseable_ids_are_not_found() {
        let store = MemoryStore::new();
        store.put_user(memory::user("u1", "u1@club.org"));
        let state = testing::state(store);

        let caller = testing::caller(&state, "u1").await;
        let err = get_progress(State(state.clone()), caller, Path("not-a-sheet".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let caller = testing::caller(&state, "u1").await;
        let err = set_status(
            State(state),
            caller,
            Path((Uuid::new_v4().to_string(), "x".into())),
            ApiJson(StatusRequest { status: "Done".into() }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_status_body_is_bad_request() {
        let (store, sheet_id, problem_id) = store_with_problem().await;
        let state = AppState {
            identity: Arc::new(StaticIdentity::new().with("tok-u1", "u1", Some("u1@club.org"))),
            ..testing::state(store)
        };
        let app = crate::routes::router().with_state(state);

        for body in [r#"{"status":5}"#, r#"{"status":null}"#, r#"{"status":"Bogus"}"#, "{"] {
            let request = Request::builder()
                .method("PUT")
                .uri(format!("/progress/{}/{}", sheet_id, problem_id))
                .header(header::AUTHORIZATION, "Bearer tok-u1")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap();
            let resp = app.clone().oneshot(request).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);

            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["code"], "VALIDATION_ERROR", "body: {}", body);
        }
    }
}
