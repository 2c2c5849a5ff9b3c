//! Badge Endpoints
//!
//! 목록 조회는 공개, 나머지는 관리자 전용.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AdminCaller,
    db::{Badge, BadgePatch},
    error::ApiError,
    routes::ApiJson,
    services::{
        badges::{self, AwardReport, GenerationReport, ManualBadge},
        users::AwardedBadge,
    },
    types::{parse_id, Ack, BadgeKind},
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: BadgeKind,
    pub sheet_id: Option<Uuid>,
    pub criteria: Option<String>,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl From<Badge> for BadgeView {
    fn from(b: Badge) -> Self {
        Self {
            id: b.id,
            name: b.name,
            description: b.description,
            kind: b.kind,
            sheet_id: b.sheet_id,
            criteria: b.criteria,
            color: b.color,
            icon: b.icon,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BadgeListResponse {
    pub badges: Vec<BadgeView>,
}

#[derive(Debug, Serialize)]
pub struct UserBadgesResponse {
    pub badges: Vec<AwardedBadge>,
}

#[derive(Debug, Serialize)]
pub struct BadgeResponse {
    pub ok: bool,
    pub badge: BadgeView,
}

#[derive(Debug, Deserialize)]
pub struct CreateBadgeRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBadgeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardRequest {
    pub user_uid: Option<String>,
    pub badge_id: Option<String>,
}

impl AwardRequest {
    fn target(self) -> Result<(String, Uuid), ApiError> {
        match (self.user_uid, self.badge_id) {
            (Some(uid), Some(badge_id)) if !uid.is_empty() && !badge_id.is_empty() => {
                Ok((uid, parse_id(&badge_id, "Badge")?))
            }
            _ => Err(ApiError::BadRequest("userUid and badgeId required".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: GenerationReport,
}

#[derive(Debug, Serialize)]
pub struct AutoAwardResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: AwardReport,
}

// ============ Handlers ============

/// GET /badges
pub async fn list_badges(State(state): State<AppState>) -> Result<Json<BadgeListResponse>, ApiError> {
    let badges = state
        .store
        .list_badges()
        .await?
        .into_iter()
        .map(BadgeView::from)
        .collect();
    Ok(Json(BadgeListResponse { badges }))
}

/// GET /badges/user/:uid
pub async fn user_badges(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<UserBadgesResponse>, ApiError> {
    let badges = state
        .store
        .awards_for_user(&uid)
        .await?
        .into_iter()
        .map(AwardedBadge::from)
        .collect();
    Ok(Json(UserBadgesResponse { badges }))
}

/// POST /badges
pub async fn create_badge(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<CreateBadgeRequest>,
) -> Result<Json<BadgeResponse>, ApiError> {
    let badge = badges::create_manual(
        state.store.as_ref(),
        ManualBadge {
            name: req.name,
            description: req.description,
            color: req.color,
            icon: req.icon,
        },
    )
    .await?;
    Ok(Json(BadgeResponse {
        ok: true,
        badge: badge.into(),
    }))
}

/// PUT /badges/:badgeId
pub async fn update_badge(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(badge_id): Path<String>,
    ApiJson(req): ApiJson<UpdateBadgeRequest>,
) -> Result<Json<BadgeResponse>, ApiError> {
    let badge_id = parse_id(&badge_id, "Badge")?;
    let badge = badges::update(
        state.store.as_ref(),
        badge_id,
        BadgePatch {
            name: req.name,
            description: req.description,
            color: req.color,
            icon: req.icon,
        },
    )
    .await?;
    Ok(Json(BadgeResponse {
        ok: true,
        badge: badge.into(),
    }))
}

/// DELETE /badges/:badgeId
pub async fn delete_badge(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(badge_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let badge_id = parse_id(&badge_id, "Badge")?;
    badges::delete(state.store.as_ref(), badge_id).await?;
    Ok(Json(Ack::ok()))
}

/// POST /badges/award
pub async fn award_badge(
    State(state): State<AppState>,
    admin: AdminCaller,
    ApiJson(req): ApiJson<AwardRequest>,
) -> Result<Json<Ack>, ApiError> {
    let (uid, badge_id) = req.target()?;
    badges::award(state.store.as_ref(), &uid, badge_id, admin.uid()).await?;
    Ok(Json(Ack::ok()))
}

/// DELETE /badges/award
pub async fn revoke_badge(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<AwardRequest>,
) -> Result<Json<Ack>, ApiError> {
    let (uid, badge_id) = req.target()?;
    badges::revoke(state.store.as_ref(), &uid, badge_id).await?;
    Ok(Json(Ack::ok()))
}

/// POST /badges/generate-sheet-badges
pub async fn generate_sheet_badges(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<GenerateResponse>, ApiError> {
    let report = badges::generate_sheet_badges(state.store.as_ref()).await?;
    Ok(Json(GenerateResponse { ok: true, report }))
}

/// POST /badges/auto-award-sheet-badges
pub async fn auto_award_sheet_badges(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<AutoAwardResponse>, ApiError> {
    let report = badges::auto_award(state.store.as_ref()).await?;
    Ok(Json(AutoAwardResponse { ok: true, report }))
}
