//! Own Profile Endpoints
//!
//! `/auth/me`는 레코드가 없으면 자동 생성. 관리자가 대기 중인 사용자를 바로
//! 볼 수 있도록 첫 로그인에서 만들어 둠.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    db::ProfileFields,
    error::ApiError,
    routes::ApiJson,
    services::{users, users::UserView, Identity},
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserView,
}

/// 프로필 제출 요청. 네 필드 모두 필요.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub ok: bool,
    pub user: UserView,
}

// ============ Handlers ============

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<MeResponse>, ApiError> {
    let allow_list = &state.config.admin_emails;
    let user = users::me(
        state.store.as_ref(),
        &identity.uid,
        identity.email.as_deref(),
        identity.name.as_deref(),
        allow_list,
    )
    .await?;

    Ok(Json(MeResponse {
        user: UserView::new(user, allow_list),
    }))
}

/// POST /auth/profile
///
/// `approved`, `isAdmin`은 요청 본문에 있어도 무시됨
pub async fn save_profile(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let allow_list = &state.config.admin_emails;
    let user = users::save_profile(
        state.store.as_ref(),
        &identity.uid,
        identity.email.as_deref(),
        ProfileFields {
            full_name: req.full_name,
            department: req.department,
            registration_number: req.registration_number,
            phone_number: req.phone_number,
        },
        allow_list,
    )
    .await?;

    Ok(Json(ProfileResponse {
        ok: true,
        user: UserView::new(user, allow_list),
    }))
}
