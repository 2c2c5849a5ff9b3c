//! Request authentication
//!
//! 세 단계 extractor:
//!
//! - `Identity`: 토큰 검증만 (`/auth/*`처럼 레코드가 없어도 되는 경로)
//! - `Caller`: 신원 + 사용자 레코드 + 요청 단위로 한 번 계산한 `Viewer`
//! - `AdminCaller`: 관리자가 아니면 403 `Admin only`

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::User;
use crate::error::ApiError;
use crate::services::{Identity, Viewer};
use crate::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        state.identity.verify(token).await
    }
}

/// 인증된 호출자
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Identity,
    /// 아직 `/auth/me`를 호출하지 않은 사용자는 레코드가 없음
    pub user: Option<User>,
    pub viewer: Viewer,
}

impl Caller {
    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn is_admin(&self) -> bool {
        self.viewer.is_admin
    }

    pub fn is_approved(&self) -> bool {
        self.user.as_ref().map_or(false, |u| u.approved)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        let user = state.store.find_user(&identity.uid).await?;
        let viewer = Viewer::resolve(
            user.as_ref(),
            identity.email.as_deref(),
            &state.config.admin_emails,
        );
        Ok(Caller { identity, user, viewer })
    }
}

/// 관리자 호출자
#[derive(Debug, Clone)]
pub struct AdminCaller(pub Caller);

impl AdminCaller {
    pub fn uid(&self) -> &str {
        self.0.uid()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            tracing::debug!(uid = caller.uid(), "Admin route refused");
            return Err(ApiError::Forbidden("Admin only".to_string()));
        }
        Ok(AdminCaller(caller))
    }
}
