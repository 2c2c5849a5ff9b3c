//! User / Role management
//!
//! 본인 프로필 (자동 생성, 제출), 관리자용 승인/권한/삭제, 공개 프로필 통계.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::access::is_admin;
use super::activity::{self, Action};
use crate::config::AdminAllowList;
use crate::db::{Badge, NewUser, ProfileFields, Store, User, UserBadge};
use crate::error::ApiError;
use crate::types::{BadgeKind, ProblemStatus};

/// 응답용 사용자 (`isAdmin`은 저장 플래그 OR allow-list)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub uid: String,
    pub email: Option<String>,
    pub full_name: String,
    pub department: String,
    pub registration_number: String,
    pub phone_number: String,
    pub approved: bool,
    pub is_admin: bool,
    pub allowed_sheets: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: User, allow_list: &AdminAllowList) -> Self {
        let is_admin = is_admin(&user, allow_list);
        Self {
            uid: user.uid,
            email: user.email,
            full_name: user.full_name,
            department: user.department,
            registration_number: user.registration_number,
            phone_number: user.phone_number,
            approved: user.approved,
            is_admin,
            allowed_sheets: user.allowed_sheets,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

async fn existing_user(store: &dyn Store, uid: &str) -> Result<User, ApiError> {
    store
        .find_user(uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}

// ============ Own profile ============

/// 본인 레코드 조회, 없으면 최소 레코드 생성
///
/// allow-list 이메일이면 승인 상태로 생성
pub async fn me(
    store: &dyn Store,
    uid: &str,
    email: Option<&str>,
    name: Option<&str>,
    allow_list: &AdminAllowList,
) -> Result<User, ApiError> {
    if let Some(user) = store.find_user(uid).await? {
        return Ok(user);
    }

    let approved = allow_list.contains(email);
    let user = store
        .insert_user_if_absent(NewUser {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            full_name: name.unwrap_or_default().to_string(),
            approved,
        })
        .await?;
    tracing::info!(uid, approved, "User auto-provisioned");
    Ok(user)
}

/// 프로필 제출. 네 필드 모두 필요.
///
/// 기존 `approved`/`is_admin`은 건드리지 않고, 새로 만들 때는 allow-list 여부로 승인
pub async fn save_profile(
    store: &dyn Store,
    uid: &str,
    email: Option<&str>,
    fields: ProfileFields,
    allow_list: &AdminAllowList,
) -> Result<User, ApiError> {
    let fields = ProfileFields {
        full_name: fields.full_name.trim().to_string(),
        department: fields.department.trim().to_string(),
        registration_number: fields.registration_number.trim().to_string(),
        phone_number: fields.phone_number.trim().to_string(),
    };
    if fields.full_name.is_empty()
        || fields.department.is_empty()
        || fields.registration_number.is_empty()
        || fields.phone_number.is_empty()
    {
        return Err(ApiError::ValidationError("Missing fields".to_string()));
    }

    store
        .save_profile(uid, email, fields, allow_list.contains(email))
        .await
}

// ============ Admin ============

/// 승인 상태 변경 + 활동 로그
pub async fn set_approved(store: &dyn Store, uid: &str, approved: bool) -> Result<(), ApiError> {
    if !store.set_approved(uid, approved).await? {
        return Err(ApiError::NotFound("User".to_string()));
    }
    let action = if approved {
        Action::UserApproved
    } else {
        Action::UserUnapproved
    };
    activity::record(store, uid, action, json!({})).await;
    tracing::info!(uid, approved, "User approval changed");
    Ok(())
}

pub async fn set_role(store: &dyn Store, uid: &str, is_admin: bool) -> Result<(), ApiError> {
    if !store.set_admin(uid, is_admin).await? {
        return Err(ApiError::NotFound("User".to_string()));
    }
    tracing::info!(uid, is_admin, "User role changed");
    Ok(())
}

/// restricted 시트 접근 권한 부여/회수
pub async fn set_sheet_permission(
    store: &dyn Store,
    uid: &str,
    sheet_id: Uuid,
    allowed: bool,
) -> Result<User, ApiError> {
    if store.find_sheet(sheet_id).await?.is_none() {
        return Err(ApiError::NotFound("Sheet".to_string()));
    }
    existing_user(store, uid).await?;

    if allowed {
        store.grant_sheet(uid, sheet_id).await?;
    } else {
        store.revoke_sheet(uid, sheet_id).await?;
    }
    existing_user(store, uid).await
}

/// 사용자 삭제: 진행 기록 → 배지 수여 → 사용자
///
/// 자기 자신은 삭제할 수 없음
pub async fn delete_user(store: &dyn Store, uid: &str, acting_uid: &str) -> Result<(), ApiError> {
    if uid == acting_uid {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }
    existing_user(store, uid).await?;

    let entries = store.delete_progress_for_user(uid).await?;
    let awards = store.delete_awards_for_user(uid).await?;
    store.delete_user(uid).await?;
    tracing::info!(uid, entries, awards, "User deleted");
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemActivity {
    pub id: Uuid,
    pub title: String,
    pub platform: String,
    pub link: String,
    pub sheet_id: Uuid,
    pub sheet_name: String,
    pub status: ProblemStatus,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub done_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub user: UserView,
    pub stats: UserStats,
    pub solved_problems: Vec<ProblemActivity>,
    pub problems: Vec<ProblemActivity>,
}

/// 관리자용 사용자 상세
///
/// 이미 삭제된 문제의 항목은 건너뜀. 시각이 있는 항목이 최신순으로 먼저,
/// 나머지는 시트 이름 → 제목 순.
pub async fn detail(
    store: &dyn Store,
    uid: &str,
    allow_list: &AdminAllowList,
) -> Result<UserDetail, ApiError> {
    let user = existing_user(store, uid).await?;
    let progress = store.progress_for_user(uid).await?;

    let mut status_by_problem: HashMap<Uuid, ProblemStatus> = HashMap::new();
    let mut time_by_problem: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
    let mut done_count = 0;
    for p in &progress {
        done_count += p.done_count();
        status_by_problem.extend(p.statuses.iter().map(|(k, v)| (*k, *v)));
        time_by_problem.extend(p.status_times.iter().map(|(k, v)| (*k, *v)));
    }

    let ids: Vec<Uuid> = status_by_problem.keys().copied().collect();
    let problems = store.find_problems(&ids).await?;

    let mut sheet_names: HashMap<Uuid, String> = HashMap::new();
    for sheet_id in problems.iter().map(|p| p.sheet_id).collect::<HashSet<_>>() {
        if let Some(sheet) = store.find_sheet(sheet_id).await? {
            sheet_names.insert(sheet_id, sheet.name);
        }
    }

    let mut combined: Vec<ProblemActivity> = problems
        .into_iter()
        .map(|p| ProblemActivity {
            status: status_by_problem
                .get(&p.id)
                .copied()
                .unwrap_or(ProblemStatus::Unopened),
            time: time_by_problem.get(&p.id).copied(),
            sheet_name: sheet_names.get(&p.sheet_id).cloned().unwrap_or_default(),
            id: p.id,
            title: p.title,
            platform: p.platform,
            link: p.link,
            sheet_id: p.sheet_id,
        })
        .collect();

    combined.sort_by(|a, b| match (a.time, b.time) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a
            .sheet_name
            .cmp(&b.sheet_name)
            .then_with(|| a.title.cmp(&b.title)),
    });

    let solved_problems = combined
        .iter()
        .filter(|p| p.status == ProblemStatus::Done)
        .cloned()
        .collect();

    Ok(UserDetail {
        user: UserView::new(user, allow_list),
        stats: UserStats { done_count },
        solved_problems,
        problems: combined,
    })
}

// ============ Public profile ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub uid: String,
    pub full_name: String,
    pub department: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardedBadge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: BadgeKind,
    pub sheet_id: Option<Uuid>,
    pub criteria: Option<String>,
    pub color: String,
    pub icon: String,
    pub awarded_at: DateTime<Utc>,
    pub awarded_by: Option<String>,
}

impl From<(UserBadge, Badge)> for AwardedBadge {
    fn from((award, badge): (UserBadge, Badge)) -> Self {
        Self {
            id: badge.id,
            name: badge.name,
            description: badge.description,
            kind: badge.kind,
            sheet_id: badge.sheet_id,
            criteria: badge.criteria,
            color: badge.color,
            icon: badge.icon,
            awarded_at: award.awarded_at,
            awarded_by: award.awarded_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetStat {
    pub sheet_name: String,
    pub solved: usize,
    pub tried: usize,
    pub total: usize,
    /// 반올림한 정수 퍼센트
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_solved: usize,
    pub total_tried: usize,
    pub sheet_stats: Vec<SheetStat>,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub profile: PublicProfile,
    pub badges: Vec<AwardedBadge>,
    pub stats: ProfileStats,
}

fn percentage(solved: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (solved as f64 / total as f64 * 100.0).round() as u32
}

/// 공개 프로필: 이메일, 전화번호, 승인 상태는 노출하지 않음
pub async fn public_profile(store: &dyn Store, uid: &str) -> Result<PublicProfileResponse, ApiError> {
    let user = existing_user(store, uid).await?;
    let badges = store
        .awards_for_user(uid)
        .await?
        .into_iter()
        .map(AwardedBadge::from)
        .collect();

    let mut stats = ProfileStats {
        total_solved: 0,
        total_tried: 0,
        sheet_stats: Vec::new(),
    };
    for p in store.progress_for_user(uid).await? {
        let solved = p.count(ProblemStatus::Done);
        let tried = p.count(ProblemStatus::Tried);
        stats.total_solved += solved;
        stats.total_tried += tried;

        // 삭제된 시트의 기록은 합계에만 포함
        if let Some(sheet) = store.find_sheet(p.sheet_id).await? {
            let total = store.list_problems(sheet.id).await?.len();
            stats.sheet_stats.push(SheetStat {
                sheet_name: sheet.name,
                solved,
                tried,
                total,
                percentage: percentage(solved, total),
            });
        }
    }

    let full_name = if user.full_name.is_empty() {
        "User".to_string()
    } else {
        user.full_name
    };
    Ok(PublicProfileResponse {
        profile: PublicProfile {
            uid: user.uid,
            full_name,
            department: user.department,
            registration_number: user.registration_number,
        },
        badges,
        stats,
    })
}
