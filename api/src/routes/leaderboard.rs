//! Leaderboard Endpoint (public)

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::ApiError,
    services::leaderboard::{self, LeaderboardQuery, LeaderboardRow},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardRow>,
}

/// GET /leaderboard
///
/// # Query
///
/// `sheetId`, `department`, `batch`, `includeAdmins`, `includePending`,
/// `sortBy` (doneCount | name), `sortDir` (asc | desc), `limit`
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let rows =
        leaderboard::leaderboard(state.store.as_ref(), &query, &state.config.admin_emails).await?;
    Ok(Json(LeaderboardResponse { leaderboard: rows }))
}
