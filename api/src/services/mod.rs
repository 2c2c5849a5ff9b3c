//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어. 모든 서비스는 `&dyn Store`를 받아
//! 동작하므로 PostgreSQL과 테스트용 메모리 저장소에서 같은 코드가 돎.
//!
//! # Services
//! - `access`: 시트 접근 판단 (`Viewer`, `can_access`)
//! - `progress`: 문제 상태 쓰기 경로
//! - `badges`: 티어 배지 생성 / 자동 수여, 수동 배지
//! - `leaderboard`: 순위 집계
//! - `catalog`: 시트 / 문제 관리
//! - `bulk_import`: 문제 일괄 추가
//! - `users`: 프로필, 승인, 권한
//! - `activity`: 활동 로그 기록
//! - `identity`: Bearer 토큰 검증

pub mod access;
pub mod activity;
pub mod badges;
pub mod bulk_import;
pub mod catalog;
pub mod identity;
pub mod leaderboard;
pub mod progress;
pub mod users;

pub use access::{can_access, Viewer};
pub use identity::{FirebaseIdentity, Identity, IdentityVerifier};
