//! Database Models
//!
//! Row types for users, the sheet catalog, progress entries, badges and the
//! activity log. Enum-valued columns are stored as TEXT and converted at the
//! boundary.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{BadgeKind, ProblemStatus, Tier, Visibility};

/// 사용자 레코드
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// 외부 신원 제공자의 uid
    pub uid: String,
    pub email: Option<String>,
    pub full_name: String,
    pub department: String,
    pub registration_number: String,
    pub phone_number: String,
    pub approved: bool,
    pub is_admin: bool,
    /// 명시적으로 허용된 restricted 시트
    pub allowed_sheets: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 화면 표시 이름: 이름 → 이메일 → "User"
    pub fn display_name(&self) -> String {
        if !self.full_name.is_empty() {
            self.full_name.clone()
        } else {
            self.email.clone().filter(|e| !e.is_empty()).unwrap_or_else(|| "User".to_string())
        }
    }

    pub fn grants(&self) -> HashSet<Uuid> {
        self.allowed_sheets.iter().copied().collect()
    }
}

/// 신규 사용자 (자동 생성 시)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uid: String,
    pub email: Option<String>,
    pub full_name: String,
    pub approved: bool,
}

/// 사용자가 직접 제출하는 프로필 필드
///
/// `approved`, `is_admin`은 의도적으로 포함하지 않음
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub full_name: String,
    pub department: String,
    pub registration_number: String,
    pub phone_number: String,
}

/// 시트
#[derive(Debug, Clone)]
pub struct Sheet {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// 문제
#[derive(Debug, Clone, FromRow)]
pub struct Problem {
    pub id: Uuid,
    pub sheet_id: Uuid,
    pub title: String,
    pub platform: String,
    pub link: String,
    pub created_by_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProblem {
    pub sheet_id: Uuid,
    pub title: String,
    pub platform: String,
    pub link: String,
    pub created_by_uid: Option<String>,
}

/// 문제 수정 (None = 변경 없음)
#[derive(Debug, Clone, Default)]
pub struct ProblemPatch {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub link: Option<String>,
    pub sheet_id: Option<Uuid>,
}

/// (사용자, 시트) 진행 기록 한 줄
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    pub user_uid: String,
    pub sheet_id: Uuid,
    pub problem_id: Uuid,
    pub status: ProblemStatus,
    pub updated_at: DateTime<Utc>,
}

/// (사용자, 시트) 진행 기록
///
/// 문제 id → 상태, 문제 id → 마지막 변경 시각
#[derive(Debug, Clone)]
pub struct Progress {
    pub user_uid: String,
    pub sheet_id: Uuid,
    pub statuses: HashMap<Uuid, ProblemStatus>,
    pub status_times: HashMap<Uuid, DateTime<Utc>>,
}

impl Progress {
    pub fn empty(user_uid: &str, sheet_id: Uuid) -> Self {
        Self {
            user_uid: user_uid.to_string(),
            sheet_id,
            statuses: HashMap::new(),
            status_times: HashMap::new(),
        }
    }

    /// 진행 기록 줄들을 (사용자, 시트)별 기록으로 묶음
    pub fn group(entries: Vec<ProgressEntry>) -> Vec<Progress> {
        let mut order: Vec<(String, Uuid)> = Vec::new();
        let mut grouped: HashMap<(String, Uuid), Progress> = HashMap::new();
        for entry in entries {
            let key = (entry.user_uid.clone(), entry.sheet_id);
            let progress = grouped.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Progress::empty(&entry.user_uid, entry.sheet_id)
            });
            progress.statuses.insert(entry.problem_id, entry.status);
            progress.status_times.insert(entry.problem_id, entry.updated_at);
        }
        order.into_iter().filter_map(|key| grouped.remove(&key)).collect()
    }

    pub fn count(&self, status: ProblemStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    pub fn done_count(&self) -> usize {
        self.count(ProblemStatus::Done)
    }
}

/// 배지
#[derive(Debug, Clone)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: BadgeKind,
    pub sheet_id: Option<Uuid>,
    pub criteria: Option<String>,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl Badge {
    /// 시트 티어 배지라면 해당 티어
    pub fn tier(&self) -> Option<Tier> {
        match self.kind {
            BadgeKind::Sheet => self.criteria.as_deref().and_then(Tier::from_criteria),
            BadgeKind::Manual => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBadge {
    pub name: String,
    pub description: String,
    pub kind: BadgeKind,
    pub sheet_id: Option<Uuid>,
    pub criteria: Option<String>,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default)]
pub struct BadgePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// 배지 수여 기록
#[derive(Debug, Clone, FromRow)]
pub struct UserBadge {
    pub user_uid: String,
    pub badge_id: Uuid,
    pub awarded_at: DateTime<Utc>,
    /// 수여한 관리자 uid 또는 "system"
    pub awarded_by: Option<String>,
}

/// 활동 로그
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub id: i64,
    pub user_uid: String,
    pub action: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// 활동 로그 조회 조건
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_uid: Option<String>,
    pub action: Option<String>,
    pub limit: i64,
    pub skip: i64,
}
