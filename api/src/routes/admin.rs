//! Admin Endpoints
//!
//! 시트 / 문제 / 사용자 관리. 모든 핸들러는 `AdminCaller`를 요구함.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AdminCaller,
    db::ProblemPatch,
    error::ApiError,
    routes::ApiJson,
    services::{
        bulk_import::{self, ImportReport},
        catalog::{self, ProblemInput, ProblemView, SheetSummary, SheetView},
        users::{self, UserDetail, UserView},
    },
    types::{parse_id, Ack, Visibility},
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
pub struct CreateSheetRequest {
    #[serde(default)]
    pub name: String,
    /// 기본값 public
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSheetRequest {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize)]
pub struct SheetResponse {
    pub ok: bool,
    pub sheet: SheetView,
}

#[derive(Debug, Serialize)]
pub struct SheetListResponse {
    pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Serialize)]
pub struct SheetDetailResponse {
    pub sheet: SheetView,
    pub problems: Vec<ProblemView>,
}

#[derive(Debug, Deserialize)]
pub struct ProblemRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProblemRequest {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub link: Option<String>,
    /// 다른 시트로 이동
    pub sheet_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProblemResponse {
    pub ok: bool,
    pub problem: ProblemView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub bulk_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: ImportReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub ok: bool,
    pub sheet_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub uid: Option<String>,
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub uid: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub uid: Option<String>,
    pub sheet_id: Option<String>,
    pub allowed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub ok: bool,
    pub user: UserView,
}

fn required_field(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

// ============ Sheets ============

/// GET /admin/sheets
pub async fn list_sheets(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<SheetListResponse>, ApiError> {
    let sheets = catalog::sheet_summaries(state.store.as_ref()).await?;
    Ok(Json(SheetListResponse { sheets }))
}

/// POST /admin/sheets
pub async fn create_sheet(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<CreateSheetRequest>,
) -> Result<Json<SheetResponse>, ApiError> {
    let sheet = catalog::create_sheet(state.store.as_ref(), &req.name, req.visibility).await?;
    Ok(Json(SheetResponse {
        ok: true,
        sheet: SheetView::from(&sheet),
    }))
}

/// GET /admin/sheets/:sheetId
pub async fn get_sheet(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(sheet_id): Path<String>,
) -> Result<Json<SheetDetailResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let (sheet, problems) = catalog::sheet_with_problems(state.store.as_ref(), sheet_id).await?;
    Ok(Json(SheetDetailResponse {
        sheet: SheetView::from(&sheet),
        problems: problems.iter().map(ProblemView::from).collect(),
    }))
}

/// PUT /admin/sheets/:sheetId
pub async fn update_sheet(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(sheet_id): Path<String>,
    ApiJson(req): ApiJson<UpdateSheetRequest>,
) -> Result<Json<SheetResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let sheet =
        catalog::update_sheet(state.store.as_ref(), sheet_id, req.name.as_deref(), req.visibility)
            .await?;
    Ok(Json(SheetResponse {
        ok: true,
        sheet: SheetView::from(&sheet),
    }))
}

/// DELETE /admin/sheets/:sheetId
pub async fn delete_sheet(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(sheet_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    catalog::delete_sheet(state.store.as_ref(), sheet_id).await?;
    tracing::info!(admin = admin.uid(), %sheet_id, "Sheet removed by admin");
    Ok(Json(Ack::ok()))
}

// ============ Problems ============

/// POST /admin/sheets/:sheetId/problems
pub async fn add_problem(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(sheet_id): Path<String>,
    ApiJson(req): ApiJson<ProblemRequest>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let problem = catalog::add_problem(
        state.store.as_ref(),
        sheet_id,
        ProblemInput {
            title: req.title,
            platform: req.platform,
            link: req.link,
        },
        admin.uid(),
    )
    .await?;
    Ok(Json(ProblemResponse {
        ok: true,
        problem: ProblemView::from(&problem),
    }))
}

/// POST /admin/sheets/:sheetId/problems/bulk
pub async fn bulk_add_problems(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(sheet_id): Path<String>,
    ApiJson(req): ApiJson<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let sheet_id = parse_id(&sheet_id, "Sheet")?;
    let bulk_text = req
        .bulk_text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("bulkText string required".to_string()))?;

    let report = bulk_import::import(state.store.as_ref(), sheet_id, &bulk_text, admin.uid()).await?;
    Ok(Json(BulkResponse { ok: true, report }))
}

/// PUT /admin/problems/:problemId
pub async fn update_problem(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(problem_id): Path<String>,
    ApiJson(req): ApiJson<UpdateProblemRequest>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let problem_id = parse_id(&problem_id, "Problem")?;
    let sheet_id = match req.sheet_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_id(raw, "Sheet")?),
        None => None,
    };

    let problem = catalog::update_problem(
        state.store.as_ref(),
        problem_id,
        ProblemPatch {
            title: req.title,
            platform: req.platform,
            link: req.link,
            sheet_id,
        },
    )
    .await?;
    Ok(Json(ProblemResponse {
        ok: true,
        problem: ProblemView::from(&problem),
    }))
}

/// DELETE /admin/problems/:problemId
pub async fn delete_problem(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(problem_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let problem_id = parse_id(&problem_id, "Problem")?;
    catalog::delete_problem(state.store.as_ref(), problem_id).await?;
    Ok(Json(Ack::ok()))
}

/// POST /admin/seed/greensheet
pub async fn seed_green_sheet(
    State(state): State<AppState>,
    admin: AdminCaller,
) -> Result<Json<SeedResponse>, ApiError> {
    let sheet = catalog::seed_green_sheet(state.store.as_ref(), admin.uid()).await?;
    Ok(Json(SeedResponse {
        ok: true,
        sheet_id: sheet.id,
    }))
}

// ============ Users ============

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<UserListResponse>, ApiError> {
    let allow_list = &state.config.admin_emails;
    let users = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|u| UserView::new(u, allow_list))
        .collect();
    Ok(Json(UserListResponse { users }))
}

/// GET /admin/users/:uid
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(uid): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let detail = users::detail(state.store.as_ref(), &uid, &state.config.admin_emails).await?;
    Ok(Json(detail))
}

/// POST /admin/users/approve
pub async fn approve_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<ApproveRequest>,
) -> Result<Json<Ack>, ApiError> {
    let message = "uid and approved required";
    let uid = required_field(req.uid, message)?;
    let approved = req.approved.ok_or_else(|| ApiError::BadRequest(message.to_string()))?;
    users::set_approved(state.store.as_ref(), &uid, approved).await?;
    Ok(Json(Ack::ok()))
}

/// POST /admin/users/role
pub async fn set_role(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<Json<Ack>, ApiError> {
    let message = "uid and isAdmin required";
    let uid = required_field(req.uid, message)?;
    let is_admin = req.is_admin.ok_or_else(|| ApiError::BadRequest(message.to_string()))?;
    users::set_role(state.store.as_ref(), &uid, is_admin).await?;
    Ok(Json(Ack::ok()))
}

/// POST /admin/users/permissions
pub async fn set_permission(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ApiJson(req): ApiJson<PermissionRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    let message = "uid, sheetId and allowed required";
    let uid = required_field(req.uid, message)?;
    let sheet_id = required_field(req.sheet_id, message)?;
    let allowed = req.allowed.ok_or_else(|| ApiError::BadRequest(message.to_string()))?;
    let sheet_id = parse_id(&sheet_id, "Sheet")?;

    let user = users::set_sheet_permission(state.store.as_ref(), &uid, sheet_id, allowed).await?;
    Ok(Json(PermissionResponse {
        ok: true,
        user: UserView::new(user, &state.config.admin_emails),
    }))
}

/// DELETE /admin/users/:uid
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(uid): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    users::delete_user(state.store.as_ref(), &uid, admin.uid()).await?;
    Ok(Json(Ack::ok()))
}
