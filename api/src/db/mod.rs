//! Database Module
//!
//! PostgreSQL 구현 (`sqlx`). 서비스 레이어는 `Store` trait만 바라봄.
//!
//! # Notes
//!
//! - 사용자의 restricted 시트 허용 목록은 `users.allowed_sheets UUID[]`
//! - (사용자, 시트) 진행 기록은 `progress_entries`의 여러 줄로 표현되며,
//!   상태 변경은 `INSERT ... ON CONFLICT DO UPDATE` 한 문장으로 원자적 upsert
//! - 외래키 없음: 삭제 cascade는 서비스가 순서대로 호출 (best-effort)
//!
//! Q: 커넥션 풀은 어떻게 관리하는가?
//! A: SQLx의 PgPool 사용
//!    - 최소/최대 커넥션 수 설정
//!    - 커넥션 재사용 (오버헤드 감소)
//!    - 타임아웃 처리

mod models;
mod repository;
#[cfg(test)]
pub mod memory;

pub use models::*;
pub use repository::{Store, StoreResult};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::{BadgeKind, ProblemStatus, Visibility};

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10
    /// - min_connections: 1
    /// - acquire_timeout: 3초
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }
}

// ============ Row types ============
// TEXT 컬럼의 enum 값은 여기서 변환. 저장된 값이 잘못된 경우는 DB 오류로 취급.

fn corrupt(column: &str, value: &str) -> ApiError {
    ApiError::DatabaseError(format!("unexpected {} value: {}", column, value))
}

#[derive(FromRow)]
struct SheetRow {
    id: Uuid,
    name: String,
    visibility: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SheetRow> for Sheet {
    type Error = ApiError;

    fn try_from(row: SheetRow) -> Result<Self, Self::Error> {
        let visibility = row
            .visibility
            .parse::<Visibility>()
            .map_err(|_| corrupt("visibility", &row.visibility))?;
        Ok(Sheet {
            id: row.id,
            name: row.name,
            visibility,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct EntryRow {
    user_uid: String,
    sheet_id: Uuid,
    problem_id: Uuid,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for ProgressEntry {
    type Error = ApiError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ProblemStatus>()
            .map_err(|_| corrupt("status", &row.status))?;
        Ok(ProgressEntry {
            user_uid: row.user_uid,
            sheet_id: row.sheet_id,
            problem_id: row.problem_id,
            status,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BadgeRow {
    id: Uuid,
    name: String,
    description: String,
    kind: String,
    sheet_id: Option<Uuid>,
    criteria: Option<String>,
    color: String,
    icon: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BadgeRow> for Badge {
    type Error = ApiError;

    fn try_from(row: BadgeRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<BadgeKind>()
            .map_err(|_| corrupt("kind", &row.kind))?;
        Ok(Badge {
            id: row.id,
            name: row.name,
            description: row.description,
            kind,
            sheet_id: row.sheet_id,
            criteria: row.criteria,
            color: row.color,
            icon: row.icon,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AwardRow {
    user_uid: String,
    badge_id: Uuid,
    awarded_at: DateTime<Utc>,
    awarded_by: Option<String>,
    #[sqlx(flatten)]
    badge: BadgeRow,
}

#[derive(FromRow)]
struct ActivityRow {
    id: i64,
    user_uid: String,
    action: String,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = ApiError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const SHEET_COLUMNS: &str = "id, name, visibility, created_at";
const PROBLEM_COLUMNS: &str = "id, sheet_id, title, platform, link, created_by_uid, created_at";
const BADGE_COLUMNS: &str =
    "id, name, description, kind, sheet_id, criteria, color, icon, created_at";
const ENTRY_COLUMNS: &str = "user_uid, sheet_id, problem_id, status, updated_at";

#[async_trait]
impl Store for Database {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============ Users ============

    async fn find_user(&self, uid: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_users(&self, uids: &[String]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE uid = ANY($1)")
            .bind(uids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (uid, email, full_name, approved)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.approved)
        .execute(&self.pool)
        .await?;

        self.find_user(&user.uid).await?.ok_or(ApiError::InternalError)
    }

    async fn save_profile(
        &self,
        uid: &str,
        email: Option<&str>,
        fields: ProfileFields,
        approved_on_create: bool,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                uid, email, full_name, department, registration_number, phone_number, approved
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (uid)
            DO UPDATE SET
                email = COALESCE(EXCLUDED.email, users.email),
                full_name = EXCLUDED.full_name,
                department = EXCLUDED.department,
                registration_number = EXCLUDED.registration_number,
                phone_number = EXCLUDED.phone_number,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(uid)
        .bind(email)
        .bind(&fields.full_name)
        .bind(&fields.department)
        .bind(&fields.registration_number)
        .bind(&fields.phone_number)
        .bind(approved_on_create)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_approved(&self, uid: &str, approved: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET approved = $2, updated_at = NOW() WHERE uid = $1")
            .bind(uid)
            .bind(approved)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_admin(&self, uid: &str, is_admin: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = $2, updated_at = NOW() WHERE uid = $1")
            .bind(uid)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn grant_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET allowed_sheets = CASE
                    WHEN $2 = ANY(allowed_sheets) THEN allowed_sheets
                    ELSE array_append(allowed_sheets, $2)
                END,
                updated_at = NOW()
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .bind(sheet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET allowed_sheets = array_remove(allowed_sheets, $2), updated_at = NOW() WHERE uid = $1",
        )
        .bind(uid)
        .bind(sheet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_sheet_grants(&self, sheet_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET allowed_sheets = array_remove(allowed_sheets, $1) WHERE $1 = ANY(allowed_sheets)",
        )
        .bind(sheet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_user(&self, uid: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ Sheets ============

    async fn list_sheets(&self) -> StoreResult<Vec<Sheet>> {
        let rows = sqlx::query_as::<_, SheetRow>(&format!(
            "SELECT {} FROM sheets ORDER BY created_at, name",
            SHEET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn find_sheet(&self, id: Uuid) -> StoreResult<Option<Sheet>> {
        let row = sqlx::query_as::<_, SheetRow>(&format!(
            "SELECT {} FROM sheets WHERE id = $1",
            SHEET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Sheet::try_from).transpose()
    }

    async fn find_sheet_by_name(&self, name: &str) -> StoreResult<Option<Sheet>> {
        let row = sqlx::query_as::<_, SheetRow>(&format!(
            "SELECT {} FROM sheets WHERE name = $1",
            SHEET_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Sheet::try_from).transpose()
    }

    async fn insert_sheet(&self, name: &str, visibility: Visibility) -> StoreResult<Sheet> {
        let row = sqlx::query_as::<_, SheetRow>(&format!(
            "INSERT INTO sheets (id, name, visibility) VALUES ($1, $2, $3) RETURNING {}",
            SHEET_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(visibility.as_str())
        .fetch_one(&self.pool)
        .await?;
        Sheet::try_from(row)
    }

    async fn update_sheet(
        &self,
        id: Uuid,
        name: Option<&str>,
        visibility: Option<Visibility>,
    ) -> StoreResult<Option<Sheet>> {
        let row = sqlx::query_as::<_, SheetRow>(&format!(
            r#"
            UPDATE sheets
            SET name = COALESCE($2, name),
                visibility = COALESCE($3, visibility),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SHEET_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(visibility.map(|v| v.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Sheet::try_from).transpose()
    }

    async fn delete_sheet(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sheets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ Problems ============

    async fn list_problems(&self, sheet_id: Uuid) -> StoreResult<Vec<Problem>> {
        let problems = sqlx::query_as::<_, Problem>(&format!(
            "SELECT {} FROM problems WHERE sheet_id = $1 ORDER BY created_at, id",
            PROBLEM_COLUMNS
        ))
        .bind(sheet_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(problems)
    }

    async fn find_problem(&self, id: Uuid) -> StoreResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(&format!(
            "SELECT {} FROM problems WHERE id = $1",
            PROBLEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(problem)
    }

    async fn find_problems(&self, ids: &[Uuid]) -> StoreResult<Vec<Problem>> {
        let problems = sqlx::query_as::<_, Problem>(&format!(
            "SELECT {} FROM problems WHERE id = ANY($1)",
            PROBLEM_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(problems)
    }

    async fn insert_problem(&self, problem: NewProblem) -> StoreResult<Problem> {
        let created = sqlx::query_as::<_, Problem>(&format!(
            r#"
            INSERT INTO problems (id, sheet_id, title, platform, link, created_by_uid)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PROBLEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(problem.sheet_id)
        .bind(&problem.title)
        .bind(&problem.platform)
        .bind(&problem.link)
        .bind(&problem.created_by_uid)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> StoreResult<Option<Problem>> {
        let updated = sqlx::query_as::<_, Problem>(&format!(
            r#"
            UPDATE problems
            SET title = COALESCE($2, title),
                platform = COALESCE($3, platform),
                link = COALESCE($4, link),
                sheet_id = COALESCE($5, sheet_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROBLEM_COLUMNS
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.platform)
        .bind(&patch.link)
        .bind(patch.sheet_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM problems WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_problems_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM problems WHERE sheet_id = $1")
            .bind(sheet_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ============ Progress ============

    async fn find_progress(&self, uid: &str, sheet_id: Uuid) -> StoreResult<Progress> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM progress_entries WHERE user_uid = $1 AND sheet_id = $2",
            ENTRY_COLUMNS
        ))
        .bind(uid)
        .bind(sheet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Progress::group(convert(rows)?)
            .pop()
            .unwrap_or_else(|| Progress::empty(uid, sheet_id)))
    }

    async fn progress_for_user(&self, uid: &str) -> StoreResult<Vec<Progress>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM progress_entries WHERE user_uid = $1 ORDER BY sheet_id",
            ENTRY_COLUMNS
        ))
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(Progress::group(convert(rows)?))
    }

    async fn all_progress(&self) -> StoreResult<Vec<Progress>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM progress_entries ORDER BY user_uid, sheet_id",
            ENTRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(Progress::group(convert(rows)?))
    }

    async fn upsert_status(
        &self,
        uid: &str,
        sheet_id: Uuid,
        problem_id: Uuid,
        status: ProblemStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO progress_entries (user_uid, sheet_id, problem_id, status, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_uid, sheet_id, problem_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(uid)
        .bind(sheet_id)
        .bind(problem_id)
        .bind(status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_problem_from_progress(&self, problem_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM progress_entries WHERE problem_id = $1")
            .bind(problem_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_progress_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM progress_entries WHERE sheet_id = $1")
            .bind(sheet_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_progress_for_user(&self, uid: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM progress_entries WHERE user_uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ============ Badges ============

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        let rows = sqlx::query_as::<_, BadgeRow>(&format!(
            "SELECT {} FROM badges ORDER BY created_at",
            BADGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn find_badge(&self, id: Uuid) -> StoreResult<Option<Badge>> {
        let row = sqlx::query_as::<_, BadgeRow>(&format!(
            "SELECT {} FROM badges WHERE id = $1",
            BADGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Badge::try_from).transpose()
    }

    async fn find_tier_badge(&self, sheet_id: Uuid, criteria: &str) -> StoreResult<Option<Badge>> {
        let row = sqlx::query_as::<_, BadgeRow>(&format!(
            r#"
            SELECT {} FROM badges
            WHERE kind = 'sheet' AND sheet_id = $1 AND criteria = $2
            ORDER BY created_at
            LIMIT 1
            "#,
            BADGE_COLUMNS
        ))
        .bind(sheet_id)
        .bind(criteria)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Badge::try_from).transpose()
    }

    async fn sheet_badges(&self, sheet_id: Uuid) -> StoreResult<Vec<Badge>> {
        let rows = sqlx::query_as::<_, BadgeRow>(&format!(
            "SELECT {} FROM badges WHERE kind = 'sheet' AND sheet_id = $1 ORDER BY created_at",
            BADGE_COLUMNS
        ))
        .bind(sheet_id)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn insert_badge(&self, badge: NewBadge) -> StoreResult<Badge> {
        let row = sqlx::query_as::<_, BadgeRow>(&format!(
            r#"
            INSERT INTO badges (id, name, description, kind, sheet_id, criteria, color, icon)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            BADGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&badge.name)
        .bind(&badge.description)
        .bind(badge.kind.as_str())
        .bind(badge.sheet_id)
        .bind(&badge.criteria)
        .bind(&badge.color)
        .bind(&badge.icon)
        .fetch_one(&self.pool)
        .await?;
        Badge::try_from(row)
    }

    async fn update_badge(&self, id: Uuid, patch: BadgePatch) -> StoreResult<Option<Badge>> {
        let row = sqlx::query_as::<_, BadgeRow>(&format!(
            r#"
            UPDATE badges
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                color = COALESCE($4, color),
                icon = COALESCE($5, icon),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BADGE_COLUMNS
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.color)
        .bind(&patch.icon)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Badge::try_from).transpose()
    }

    async fn delete_badge(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM badges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ Awards ============

    async fn find_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<Option<UserBadge>> {
        let award = sqlx::query_as::<_, UserBadge>(
            "SELECT user_uid, badge_id, awarded_at, awarded_by FROM user_badges WHERE user_uid = $1 AND badge_id = $2",
        )
        .bind(uid)
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(award)
    }

    async fn insert_award(
        &self,
        uid: &str,
        badge_id: Uuid,
        awarded_by: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_badges (user_uid, badge_id, awarded_at, awarded_by)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_uid, badge_id) DO NOTHING
            "#,
        )
        .bind(uid)
        .bind(badge_id)
        .bind(awarded_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_badges WHERE user_uid = $1 AND badge_id = $2")
            .bind(uid)
            .bind(badge_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn awards_for_user(&self, uid: &str) -> StoreResult<Vec<(UserBadge, Badge)>> {
        let rows = sqlx::query_as::<_, AwardRow>(
            r#"
            SELECT
                ub.user_uid, ub.badge_id, ub.awarded_at, ub.awarded_by,
                b.id, b.name, b.description, b.kind, b.sheet_id, b.criteria,
                b.color, b.icon, b.created_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_uid = $1
            ORDER BY ub.awarded_at
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let award = UserBadge {
                    user_uid: row.user_uid,
                    badge_id: row.badge_id,
                    awarded_at: row.awarded_at,
                    awarded_by: row.awarded_by,
                };
                Ok((award, Badge::try_from(row.badge)?))
            })
            .collect()
    }

    async fn delete_awards_for_badge(&self, badge_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_badges WHERE badge_id = $1")
            .bind(badge_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_awards_for_user(&self, uid: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_badges WHERE user_uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ============ Activity ============

    async fn append_activity(
        &self,
        uid: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO activity_logs (user_uid, action, metadata, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(uid)
        .bind(action)
        .bind(Json(metadata))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activity(&self, filter: ActivityFilter) -> StoreResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, user_uid, action, metadata, created_at
            FROM activity_logs
            WHERE ($1::TEXT IS NULL OR user_uid = $1)
              AND ($2::TEXT IS NULL OR action = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.user_uid)
        .bind(&filter.action)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ActivityLog {
                id: row.id,
                user_uid: row.user_uid,
                action: row.action,
                metadata: row.metadata.0,
                created_at: row.created_at,
            })
            .collect())
    }
}
