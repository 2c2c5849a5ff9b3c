//! Public Profile Endpoint
//!
//! 인증 없이 조회 가능. 이메일, 전화번호, 승인 상태는 응답에 없음.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError,
    services::users::{self, PublicProfileResponse},
    AppState,
};

/// GET /profile/:uid
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let profile = users::public_profile(state.store.as_ref(), &uid).await?;
    Ok(Json(profile))
}
