//! Repository Pattern Implementation
//!
//! `Store`는 서비스 레이어가 보는 유일한 데이터 접근 인터페이스.
//!
//! - PostgreSQL 구현: `db/mod.rs`의 `Database`
//! - 테스트용 인메모리 구현: `db/memory.rs`의 `MemoryStore`
//!
//! 여러 컬렉션에 걸친 삭제(cascade)는 트랜잭션이 아니라 서비스가
//! 순서대로 호출하는 개별 메서드로 구성됨. 각 메서드는 단일 문장으로
//! 원자적으로 실행됨.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::*;
use crate::error::ApiError;
use crate::types::{ProblemStatus, Visibility};

pub type StoreResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// 연결 상태 확인
    async fn ping(&self) -> StoreResult<()>;

    // ============ Users ============

    async fn find_user(&self, uid: &str) -> StoreResult<Option<User>>;
    async fn find_users(&self, uids: &[String]) -> StoreResult<Vec<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// 없으면 생성, 있으면 기존 레코드 반환
    async fn insert_user_if_absent(&self, user: NewUser) -> StoreResult<User>;
    /// 프로필 upsert. `approved`/`is_admin`은 기존 값 유지,
    /// 새로 생성되는 경우에만 `approved_on_create` 적용
    async fn save_profile(
        &self,
        uid: &str,
        email: Option<&str>,
        fields: ProfileFields,
        approved_on_create: bool,
    ) -> StoreResult<User>;
    /// 대상이 없으면 false
    async fn set_approved(&self, uid: &str, approved: bool) -> StoreResult<bool>;
    async fn set_admin(&self, uid: &str, is_admin: bool) -> StoreResult<bool>;
    async fn grant_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool>;
    async fn revoke_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool>;
    /// 모든 사용자의 허용 목록에서 시트 제거
    async fn remove_sheet_grants(&self, sheet_id: Uuid) -> StoreResult<u64>;
    async fn delete_user(&self, uid: &str) -> StoreResult<bool>;

    // ============ Sheets ============

    async fn list_sheets(&self) -> StoreResult<Vec<Sheet>>;
    async fn find_sheet(&self, id: Uuid) -> StoreResult<Option<Sheet>>;
    async fn find_sheet_by_name(&self, name: &str) -> StoreResult<Option<Sheet>>;
    /// 이름 중복 시 Conflict
    async fn insert_sheet(&self, name: &str, visibility: Visibility) -> StoreResult<Sheet>;
    async fn update_sheet(
        &self,
        id: Uuid,
        name: Option<&str>,
        visibility: Option<Visibility>,
    ) -> StoreResult<Option<Sheet>>;
    async fn delete_sheet(&self, id: Uuid) -> StoreResult<bool>;

    // ============ Problems ============

    /// 생성 순서대로
    async fn list_problems(&self, sheet_id: Uuid) -> StoreResult<Vec<Problem>>;
    async fn find_problem(&self, id: Uuid) -> StoreResult<Option<Problem>>;
    async fn find_problems(&self, ids: &[Uuid]) -> StoreResult<Vec<Problem>>;
    async fn insert_problem(&self, problem: NewProblem) -> StoreResult<Problem>;
    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> StoreResult<Option<Problem>>;
    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool>;
    async fn delete_problems_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64>;

    // ============ Progress ============

    /// 기록이 없으면 빈 Progress
    async fn find_progress(&self, uid: &str, sheet_id: Uuid) -> StoreResult<Progress>;
    async fn progress_for_user(&self, uid: &str) -> StoreResult<Vec<Progress>>;
    async fn all_progress(&self) -> StoreResult<Vec<Progress>>;
    /// 단일 원자적 upsert: 상태와 시각을 항상 갱신
    async fn upsert_status(
        &self,
        uid: &str,
        sheet_id: Uuid,
        problem_id: Uuid,
        status: ProblemStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// 모든 진행 기록에서 해당 문제 항목 제거
    async fn remove_problem_from_progress(&self, problem_id: Uuid) -> StoreResult<u64>;
    async fn delete_progress_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64>;
    async fn delete_progress_for_user(&self, uid: &str) -> StoreResult<u64>;

    // ============ Badges ============

    async fn list_badges(&self) -> StoreResult<Vec<Badge>>;
    async fn find_badge(&self, id: Uuid) -> StoreResult<Option<Badge>>;
    /// (시트, criteria) 티어 배지
    async fn find_tier_badge(&self, sheet_id: Uuid, criteria: &str) -> StoreResult<Option<Badge>>;
    async fn sheet_badges(&self, sheet_id: Uuid) -> StoreResult<Vec<Badge>>;
    async fn insert_badge(&self, badge: NewBadge) -> StoreResult<Badge>;
    async fn update_badge(&self, id: Uuid, patch: BadgePatch) -> StoreResult<Option<Badge>>;
    async fn delete_badge(&self, id: Uuid) -> StoreResult<bool>;

    // ============ Awards ============

    async fn find_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<Option<UserBadge>>;
    /// 이미 있으면 false (중복 삽입 없음)
    async fn insert_award(
        &self,
        uid: &str,
        badge_id: Uuid,
        awarded_by: Option<&str>,
    ) -> StoreResult<bool>;
    async fn delete_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<bool>;
    /// 수여 기록과 배지를 함께 (배지가 사라진 기록은 제외)
    async fn awards_for_user(&self, uid: &str) -> StoreResult<Vec<(UserBadge, Badge)>>;
    async fn delete_awards_for_badge(&self, badge_id: Uuid) -> StoreResult<u64>;
    async fn delete_awards_for_user(&self, uid: &str) -> StoreResult<u64>;

    // ============ Activity ============

    async fn append_activity(
        &self,
        uid: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> StoreResult<()>;
    /// 최신순
    async fn list_activity(&self, filter: ActivityFilter) -> StoreResult<Vec<ActivityLog>>;
}
