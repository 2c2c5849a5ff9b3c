//! Sheet List Endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    auth::Caller,
    error::ApiError,
    services::catalog::{self, SheetWithProgress},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct SheetsResponse {
    pub sheets: Vec<SheetWithProgress>,
}

/// GET /sheets
///
/// 승인된 사용자 또는 관리자만. 관리자는 승인 전이어도 허용.
pub async fn list_sheets(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SheetsResponse>, ApiError> {
    if !caller.is_approved() && !caller.is_admin() {
        return Err(ApiError::Forbidden("Waiting for approval".to_string()));
    }

    let sheets = catalog::visible_sheets(state.store.as_ref(), caller.uid(), &caller.viewer).await?;
    Ok(Json(SheetsResponse { sheets }))
}
