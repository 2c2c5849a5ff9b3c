//! CP Sheets API Library
//!
//! # Overview
//!
//! 동아리용 알고리즘 문제 풀이 트래커의 백엔드 API.
//! 사용자는 공유 시트의 문제를 시도/완료로 표시하고 리더보드를 보며,
//! 관리자는 시트와 문제를 관리하고 사용자를 승인하고 배지를 수여함.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                          API                              │
//! │                                                           │
//! │  ┌─────────┐  ┌─────────┐  ┌──────────┐  ┌─────────┐     │
//! │  │ Routes  │─▶│  Auth   │─▶│ Services │─▶│  Store  │     │
//! │  └─────────┘  └─────────┘  └──────────┘  └────┬────┘     │
//! │                                               │          │
//! └───────────────────────────────────────────────┼──────────┘
//!                                                 ▼
//!                                        ┌────────────────┐
//!                                        │   PostgreSQL   │
//!                                        └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리 (관리자 allow-list 포함)
//! - `error`: 에러 타입 및 처리
//! - `auth`: Bearer 토큰 → `Caller` / `AdminCaller` extractor
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 접근 제어, 진행 기록, 배지, 리더보드
//! - `db`: 저장소 trait과 PostgreSQL 구현
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cp_sheets_api::{config::Config, db::Database, services::FirebaseIdentity};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!     let identity = FirebaseIdentity::new(&config.identity_lookup_url, &config.identity_api_key)?;
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::{Database, Store};
pub use error::ApiError;
pub use services::{FirebaseIdentity, IdentityVerifier};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub config: Arc<Config>,
}
