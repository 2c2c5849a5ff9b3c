//! 테스트용 인메모리 Store
//!
//! PostgreSQL 구현과 같은 의미를 유지하도록 작성됨 (upsert, 중복 무시 등).
//! 삽입 순서가 곧 조회 순서.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::*;
use super::repository::{Store, StoreResult};
use crate::error::ApiError;
use crate::types::{BadgeKind, ProblemStatus, Visibility};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sheets: Vec<Sheet>,
    problems: Vec<Problem>,
    entries: Vec<ProgressEntry>,
    badges: Vec<Badge>,
    awards: Vec<UserBadge>,
    activity: Vec<ActivityLog>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// 이 이름의 삭제 연산은 DB 오류를 반환
    failing: RwLock<Option<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트 준비용: 사용자 레코드를 그대로 넣음
    pub fn put_user(&self, user: User) {
        let mut t = self.tables.write().unwrap();
        t.users.retain(|u| u.uid != user.uid);
        t.users.push(user);
    }

    /// 이후 `op` 삭제 연산이 실패하도록 설정
    pub fn fail_on(&self, op: &'static str) {
        *self.failing.write().unwrap() = Some(op);
    }

    pub fn recover(&self) {
        *self.failing.write().unwrap() = None;
    }

    fn check(&self, op: &str) -> StoreResult<()> {
        match *self.failing.read().unwrap() {
            Some(failing) if failing == op => {
                Err(ApiError::DatabaseError(format!("{} failed", op)))
            }
            _ => Ok(()),
        }
    }

    pub fn activity_count(&self, action: &str) -> usize {
        let t = self.tables.read().unwrap();
        t.activity.iter().filter(|a| a.action == action).count()
    }
}

/// 테스트용 사용자 레코드
pub fn user(uid: &str, email: &str) -> User {
    User {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        full_name: uid.to_string(),
        department: String::new(),
        registration_number: String::new(),
        phone_number: String::new(),
        approved: true,
        is_admin: false,
        allowed_sheets: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ============ Users ============

    async fn find_user(&self, uid: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().unwrap();
        Ok(t.users.iter().find(|u| u.uid == uid).cloned())
    }

    async fn find_users(&self, uids: &[String]) -> StoreResult<Vec<User>> {
        let t = self.tables.read().unwrap();
        Ok(t.users.iter().filter(|u| uids.contains(&u.uid)).cloned().collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().unwrap().users.clone())
    }

    async fn insert_user_if_absent(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().unwrap();
        if let Some(existing) = t.users.iter().find(|u| u.uid == new.uid) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let created = User {
            uid: new.uid,
            email: new.email,
            full_name: new.full_name,
            department: String::new(),
            registration_number: String::new(),
            phone_number: String::new(),
            approved: new.approved,
            is_admin: false,
            allowed_sheets: vec![],
            created_at: now,
            updated_at: now,
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn save_profile(
        &self,
        uid: &str,
        email: Option<&str>,
        fields: ProfileFields,
        approved_on_create: bool,
    ) -> StoreResult<User> {
        let mut t = self.tables.write().unwrap();
        let now = Utc::now();
        if let Some(existing) = t.users.iter_mut().find(|u| u.uid == uid) {
            if let Some(email) = email {
                existing.email = Some(email.to_string());
            }
            existing.full_name = fields.full_name;
            existing.department = fields.department;
            existing.registration_number = fields.registration_number;
            existing.phone_number = fields.phone_number;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let created = User {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            full_name: fields.full_name,
            department: fields.department,
            registration_number: fields.registration_number,
            phone_number: fields.phone_number,
            approved: approved_on_create,
            is_admin: false,
            allowed_sheets: vec![],
            created_at: now,
            updated_at: now,
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn set_approved(&self, uid: &str, approved: bool) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        Ok(t.users
            .iter_mut()
            .find(|u| u.uid == uid)
            .map(|u| u.approved = approved)
            .is_some())
    }

    async fn set_admin(&self, uid: &str, is_admin: bool) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        Ok(t.users
            .iter_mut()
            .find(|u| u.uid == uid)
            .map(|u| u.is_admin = is_admin)
            .is_some())
    }

    async fn grant_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        Ok(t.users
            .iter_mut()
            .find(|u| u.uid == uid)
            .map(|u| {
                if !u.allowed_sheets.contains(&sheet_id) {
                    u.allowed_sheets.push(sheet_id);
                }
            })
            .is_some())
    }

    async fn revoke_sheet(&self, uid: &str, sheet_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        Ok(t.users
            .iter_mut()
            .find(|u| u.uid == uid)
            .map(|u| u.allowed_sheets.retain(|s| *s != sheet_id))
            .is_some())
    }

    async fn remove_sheet_grants(&self, sheet_id: Uuid) -> StoreResult<u64> {
        let mut t = self.tables.write().unwrap();
        let mut touched = 0;
        for u in t.users.iter_mut().filter(|u| u.allowed_sheets.contains(&sheet_id)) {
            u.allowed_sheets.retain(|s| *s != sheet_id);
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_user(&self, uid: &str) -> StoreResult<bool> {
        self.check("delete_user")?;
        let mut t = self.tables.write().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.uid != uid);
        Ok(t.users.len() < before)
    }

    // ============ Sheets ============

    async fn list_sheets(&self) -> StoreResult<Vec<Sheet>> {
        Ok(self.tables.read().unwrap().sheets.clone())
    }

    async fn find_sheet(&self, id: Uuid) -> StoreResult<Option<Sheet>> {
        let t = self.tables.read().unwrap();
        Ok(t.sheets.iter().find(|s| s.id == id).cloned())
    }

    async fn find_sheet_by_name(&self, name: &str) -> StoreResult<Option<Sheet>> {
        let t = self.tables.read().unwrap();
        Ok(t.sheets.iter().find(|s| s.name == name).cloned())
    }

    async fn insert_sheet(&self, name: &str, visibility: Visibility) -> StoreResult<Sheet> {
        let mut t = self.tables.write().unwrap();
        if t.sheets.iter().any(|s| s.name == name) {
            return Err(ApiError::Conflict("Duplicate entry".to_string()));
        }
        let sheet = Sheet {
            id: Uuid::new_v4(),
            name: name.to_string(),
            visibility,
            created_at: Utc::now(),
        };
        t.sheets.push(sheet.clone());
        Ok(sheet)
    }

    async fn update_sheet(
        &self,
        id: Uuid,
        name: Option<&str>,
        visibility: Option<Visibility>,
    ) -> StoreResult<Option<Sheet>> {
        let mut t = self.tables.write().unwrap();
        if let Some(name) = name {
            if t.sheets.iter().any(|s| s.name == name && s.id != id) {
                return Err(ApiError::Conflict("Duplicate entry".to_string()));
            }
        }
        Ok(t.sheets.iter_mut().find(|s| s.id == id).map(|s| {
            if let Some(name) = name {
                s.name = name.to_string();
            }
            if let Some(visibility) = visibility {
                s.visibility = visibility;
            }
            s.clone()
        }))
    }

    async fn delete_sheet(&self, id: Uuid) -> StoreResult<bool> {
        self.check("delete_sheet")?;
        let mut t = self.tables.write().unwrap();
        let before = t.sheets.len();
        t.sheets.retain(|s| s.id != id);
        Ok(t.sheets.len() < before)
    }

    // ============ Problems ============

    async fn list_problems(&self, sheet_id: Uuid) -> StoreResult<Vec<Problem>> {
        let t = self.tables.read().unwrap();
        Ok(t.problems.iter().filter(|p| p.sheet_id == sheet_id).cloned().collect())
    }

    async fn find_problem(&self, id: Uuid) -> StoreResult<Option<Problem>> {
        let t = self.tables.read().unwrap();
        Ok(t.problems.iter().find(|p| p.id == id).cloned())
    }

    async fn find_problems(&self, ids: &[Uuid]) -> StoreResult<Vec<Problem>> {
        let t = self.tables.read().unwrap();
        Ok(t.problems.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn insert_problem(&self, new: NewProblem) -> StoreResult<Problem> {
        let mut t = self.tables.write().unwrap();
        let problem = Problem {
            id: Uuid::new_v4(),
            sheet_id: new.sheet_id,
            title: new.title,
            platform: new.platform,
            link: new.link,
            created_by_uid: new.created_by_uid,
            created_at: Utc::now(),
        };
        t.problems.push(problem.clone());
        Ok(problem)
    }

    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> StoreResult<Option<Problem>> {
        let mut t = self.tables.write().unwrap();
        Ok(t.problems.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(title) = patch.title {
                p.title = title;
            }
            if let Some(platform) = patch.platform {
                p.platform = platform;
            }
            if let Some(link) = patch.link {
                p.link = link;
            }
            if let Some(sheet_id) = patch.sheet_id {
                p.sheet_id = sheet_id;
            }
            p.clone()
        }))
    }

    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool> {
        self.check("delete_problem")?;
        let mut t = self.tables.write().unwrap();
        let before = t.problems.len();
        t.problems.retain(|p| p.id != id);
        Ok(t.problems.len() < before)
    }

    async fn delete_problems_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64> {
        self.check("delete_problems_for_sheet")?;
        let mut t = self.tables.write().unwrap();
        let before = t.problems.len();
        t.problems.retain(|p| p.sheet_id != sheet_id);
        Ok((before - t.problems.len()) as u64)
    }

    // ============ Progress ============

    async fn find_progress(&self, uid: &str, sheet_id: Uuid) -> StoreResult<Progress> {
        let t = self.tables.read().unwrap();
        let entries = t
            .entries
            .iter()
            .filter(|e| e.user_uid == uid && e.sheet_id == sheet_id)
            .cloned()
            .collect();
        Ok(Progress::group(entries)
            .pop()
            .unwrap_or_else(|| Progress::empty(uid, sheet_id)))
    }

    async fn progress_for_user(&self, uid: &str) -> StoreResult<Vec<Progress>> {
        let t = self.tables.read().unwrap();
        let entries = t.entries.iter().filter(|e| e.user_uid == uid).cloned().collect();
        Ok(Progress::group(entries))
    }

    async fn all_progress(&self) -> StoreResult<Vec<Progress>> {
        Ok(Progress::group(self.tables.read().unwrap().entries.clone()))
    }

    async fn upsert_status(
        &self,
        uid: &str,
        sheet_id: Uuid,
        problem_id: Uuid,
        status: ProblemStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut t = self.tables.write().unwrap();
        match t.entries.iter_mut().find(|e| {
            e.user_uid == uid && e.sheet_id == sheet_id && e.problem_id == problem_id
        }) {
            Some(entry) => {
                entry.status = status;
                entry.updated_at = at;
            }
            None => t.entries.push(ProgressEntry {
                user_uid: uid.to_string(),
                sheet_id,
                problem_id,
                status,
                updated_at: at,
            }),
        }
        Ok(())
    }

    async fn remove_problem_from_progress(&self, problem_id: Uuid) -> StoreResult<u64> {
        self.check("remove_problem_from_progress")?;
        let mut t = self.tables.write().unwrap();
        let before = t.entries.len();
        t.entries.retain(|e| e.problem_id != problem_id);
        Ok((before - t.entries.len()) as u64)
    }

    async fn delete_progress_for_sheet(&self, sheet_id: Uuid) -> StoreResult<u64> {
        self.check("delete_progress_for_sheet")?;
        let mut t = self.tables.write().unwrap();
        let before = t.entries.len();
        t.entries.retain(|e| e.sheet_id != sheet_id);
        Ok((before - t.entries.len()) as u64)
    }

    async fn delete_progress_for_user(&self, uid: &str) -> StoreResult<u64> {
        self.check("delete_progress_for_user")?;
        let mut t = self.tables.write().unwrap();
        let before = t.entries.len();
        t.entries.retain(|e| e.user_uid != uid);
        Ok((before - t.entries.len()) as u64)
    }

    // ============ Badges ============

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        Ok(self.tables.read().unwrap().badges.clone())
    }

    async fn find_badge(&self, id: Uuid) -> StoreResult<Option<Badge>> {
        let t = self.tables.read().unwrap();
        Ok(t.badges.iter().find(|b| b.id == id).cloned())
    }

    async fn find_tier_badge(&self, sheet_id: Uuid, criteria: &str) -> StoreResult<Option<Badge>> {
        let t = self.tables.read().unwrap();
        Ok(t.badges
            .iter()
            .find(|b| {
                b.kind == BadgeKind::Sheet
                    && b.sheet_id == Some(sheet_id)
                    && b.criteria.as_deref() == Some(criteria)
            })
            .cloned())
    }

    async fn sheet_badges(&self, sheet_id: Uuid) -> StoreResult<Vec<Badge>> {
        let t = self.tables.read().unwrap();
        Ok(t.badges
            .iter()
            .filter(|b| b.kind == BadgeKind::Sheet && b.sheet_id == Some(sheet_id))
            .cloned()
            .collect())
    }

    async fn insert_badge(&self, new: NewBadge) -> StoreResult<Badge> {
        let mut t = self.tables.write().unwrap();
        let badge = Badge {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            kind: new.kind,
            sheet_id: new.sheet_id,
            criteria: new.criteria,
            color: new.color,
            icon: new.icon,
            created_at: Utc::now(),
        };
        t.badges.push(badge.clone());
        Ok(badge)
    }

    async fn update_badge(&self, id: Uuid, patch: BadgePatch) -> StoreResult<Option<Badge>> {
        let mut t = self.tables.write().unwrap();
        Ok(t.badges.iter_mut().find(|b| b.id == id).map(|b| {
            if let Some(name) = patch.name {
                b.name = name;
            }
            if let Some(description) = patch.description {
                b.description = description;
            }
            if let Some(color) = patch.color {
                b.color = color;
            }
            if let Some(icon) = patch.icon {
                b.icon = icon;
            }
            b.clone()
        }))
    }

    async fn delete_badge(&self, id: Uuid) -> StoreResult<bool> {
        self.check("delete_badge")?;
        let mut t = self.tables.write().unwrap();
        let before = t.badges.len();
        t.badges.retain(|b| b.id != id);
        Ok(t.badges.len() < before)
    }

    // ============ Awards ============

    async fn find_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<Option<UserBadge>> {
        let t = self.tables.read().unwrap();
        Ok(t.awards
            .iter()
            .find(|a| a.user_uid == uid && a.badge_id == badge_id)
            .cloned())
    }

    async fn insert_award(
        &self,
        uid: &str,
        badge_id: Uuid,
        awarded_by: Option<&str>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        if t.awards.iter().any(|a| a.user_uid == uid && a.badge_id == badge_id) {
            return Ok(false);
        }
        t.awards.push(UserBadge {
            user_uid: uid.to_string(),
            badge_id,
            awarded_at: Utc::now(),
            awarded_by: awarded_by.map(str::to_string),
        });
        Ok(true)
    }

    async fn delete_award(&self, uid: &str, badge_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().unwrap();
        let before = t.awards.len();
        t.awards.retain(|a| !(a.user_uid == uid && a.badge_id == badge_id));
        Ok(t.awards.len() < before)
    }

    async fn awards_for_user(&self, uid: &str) -> StoreResult<Vec<(UserBadge, Badge)>> {
        let t = self.tables.read().unwrap();
        let badges: HashMap<Uuid, &Badge> = t.badges.iter().map(|b| (b.id, b)).collect();
        Ok(t.awards
            .iter()
            .filter(|a| a.user_uid == uid)
            .filter_map(|a| badges.get(&a.badge_id).map(|b| (a.clone(), (*b).clone())))
            .collect())
    }

    async fn delete_awards_for_badge(&self, badge_id: Uuid) -> StoreResult<u64> {
        self.check("delete_awards_for_badge")?;
        let mut t = self.tables.write().unwrap();
        let before = t.awards.len();
        t.awards.retain(|a| a.badge_id != badge_id);
        Ok((before - t.awards.len()) as u64)
    }

    async fn delete_awards_for_user(&self, uid: &str) -> StoreResult<u64> {
        self.check("delete_awards_for_user")?;
        let mut t = self.tables.write().unwrap();
        let before = t.awards.len();
        t.awards.retain(|a| a.user_uid != uid);
        Ok((before - t.awards.len()) as u64)
    }

    // ============ Activity ============

    async fn append_activity(
        &self,
        uid: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> StoreResult<()> {
        let mut t = self.tables.write().unwrap();
        let id = t.activity.len() as i64 + 1;
        t.activity.push(ActivityLog {
            id,
            user_uid: uid.to_string(),
            action: action.to_string(),
            metadata,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_activity(&self, filter: ActivityFilter) -> StoreResult<Vec<ActivityLog>> {
        let t = self.tables.read().unwrap();
        Ok(t.activity
            .iter()
            .rev()
            .filter(|a| filter.user_uid.as_deref().map_or(true, |u| a.user_uid == u))
            .filter(|a| filter.action.as_deref().map_or(true, |act| a.action == act))
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
