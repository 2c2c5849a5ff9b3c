//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의. `main.rs`에서 `/api` 아래에 마운트됨.
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/auth/*` - 본인 프로필
//! - `/sheets`, `/progress/*` - 시트 목록과 풀이 상태
//! - `/leaderboard` - 순위
//! - `/profile/:uid` - 공개 프로필
//! - `/admin/*` - 시트/문제/사용자 관리
//! - `/badges/*` - 배지
//! - `/activity` - 활동 로그

use axum::{
    extract::FromRequest,
    routing::{get, post, put},
    Router,
};

use crate::{error::ApiError, AppState};

pub mod account;
pub mod activity;
pub mod admin;
pub mod badges;
pub mod health;
pub mod leaderboard;
pub mod profile;
pub mod progress;
pub mod sheets;

/// JSON 요청 본문
///
/// `axum::Json`과 같지만 파싱 실패를 `ApiError`(400)로 응답
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `/api` 아래 라우트 테이블
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Own profile
        .route("/auth/me", get(account::me))
        .route("/auth/profile", post(account::save_profile))

        // Sheets & progress
        .route("/sheets", get(sheets::list_sheets))
        .route("/progress/:sheet_id", get(progress::get_progress))
        .route("/progress/:sheet_id/:problem_id", put(progress::set_status))

        // Public reads
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/profile/:uid", get(profile::get_public_profile))

        // Admin: sheets & problems
        .route("/admin/sheets", get(admin::list_sheets).post(admin::create_sheet))
        .route(
            "/admin/sheets/:sheet_id",
            get(admin::get_sheet).put(admin::update_sheet).delete(admin::delete_sheet),
        )
        .route("/admin/sheets/:sheet_id/problems", post(admin::add_problem))
        .route("/admin/sheets/:sheet_id/problems/bulk", post(admin::bulk_add_problems))
        .route(
            "/admin/problems/:problem_id",
            put(admin::update_problem).delete(admin::delete_problem),
        )
        .route("/admin/seed/greensheet", post(admin::seed_green_sheet))

        // Admin: users
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/approve", post(admin::approve_user))
        .route("/admin/users/role", post(admin::set_role))
        .route("/admin/users/permissions", post(admin::set_permission))
        .route("/admin/users/:uid", get(admin::get_user).delete(admin::delete_user))

        // Badges
        .route("/badges", get(badges::list_badges).post(badges::create_badge))
        .route("/badges/user/:uid", get(badges::user_badges))
        .route("/badges/award", post(badges::award_badge).delete(badges::revoke_badge))
        .route("/badges/generate-sheet-badges", post(badges::generate_sheet_badges))
        .route("/badges/auto-award-sheet-badges", post(badges::auto_award_sheet_badges))
        .route("/badges/:badge_id", put(badges::update_badge).delete(badges::delete_badge))

        // Activity
        .route("/activity", get(activity::list_activity))
}
