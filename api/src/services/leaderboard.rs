//! Leaderboard aggregation
//!
//! 사용자 × 진행 기록을 읽어 Done 개수로 순위를 만드는 읽기 전용 fan-out.
//!
//! 동점 처리는 정의하지 않음: 안정 정렬이므로 저장소가 돌려준 사용자 순서가
//! 유지되지만, 그 순서 자체는 보장되지 않음.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::access::{can_access, is_admin, Viewer};
use crate::config::AdminAllowList;
use crate::db::{Progress, Sheet, Store, User};
use crate::error::ApiError;
use crate::types::parse_id;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    DoneCount,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// `GET /leaderboard` 쿼리
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub sheet_id: Option<String>,
    pub department: Option<String>,
    /// 학번 부분 일치
    pub batch: Option<String>,
    #[serde(default)]
    pub include_admins: bool,
    #[serde(default)]
    pub include_pending: bool,
    pub sort_by: Option<SortKey>,
    pub sort_dir: Option<SortDir>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub uid: String,
    pub name: String,
    pub dept_batch: String,
    pub done_count: usize,
}

/// "학과-학번 앞 두 자리", 둘 중 하나라도 없으면 학과만
pub fn dept_batch(user: &User) -> String {
    if !user.department.is_empty() && !user.registration_number.is_empty() {
        let prefix: String = user.registration_number.chars().take(2).collect();
        format!("{}-{}", user.department, prefix)
    } else {
        user.department.clone()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 순수 집계 함수
///
/// `sheet`가 주어지면 그 시트의 진행 기록만 세고, 접근 권한이 없는 사용자는
/// 0점이 아니라 목록에서 제외됨.
pub fn rank(
    users: Vec<User>,
    progress: &[Progress],
    sheet: Option<&Sheet>,
    query: &LeaderboardQuery,
    allow_list: &AdminAllowList,
) -> Vec<LeaderboardRow> {
    let mut done_by_user: HashMap<&str, usize> = HashMap::new();
    for p in progress {
        if sheet.map_or(true, |s| s.id == p.sheet_id) {
            *done_by_user.entry(p.user_uid.as_str()).or_default() += p.done_count();
        }
    }

    let department = non_empty(&query.department).map(str::to_lowercase);
    let batch = non_empty(&query.batch);

    let mut rows: Vec<LeaderboardRow> = users
        .iter()
        .filter(|u| query.include_pending || u.approved)
        .filter(|u| query.include_admins || !is_admin(u, allow_list))
        .filter(|u| {
            department
                .as_deref()
                .map_or(true, |d| u.department.to_lowercase() == d)
        })
        .filter(|u| batch.map_or(true, |b| u.registration_number.contains(b)))
        .filter(|u| {
            sheet.map_or(true, |s| {
                can_access(&Viewer::resolve(Some(u), None, allow_list), Some(s))
            })
        })
        .map(|u| LeaderboardRow {
            uid: u.uid.clone(),
            name: u.display_name(),
            dept_batch: dept_batch(u),
            done_count: done_by_user.get(u.uid.as_str()).copied().unwrap_or(0),
        })
        .collect();

    let sort_by = query.sort_by.unwrap_or_default();
    let dir = query.sort_dir.unwrap_or_default();
    rows.sort_by(|a, b| {
        let ord = match sort_by {
            SortKey::DoneCount => a.done_count.cmp(&b.done_count),
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });

    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        rows.truncate(limit as usize);
    }
    rows
}

/// 저장소에서 읽어 순위 계산
pub async fn leaderboard(
    store: &dyn Store,
    query: &LeaderboardQuery,
    allow_list: &AdminAllowList,
) -> Result<Vec<LeaderboardRow>, ApiError> {
    let sheet = match non_empty(&query.sheet_id) {
        Some(raw) => {
            let id: Uuid = parse_id(raw, "Sheet")?;
            Some(
                store
                    .find_sheet(id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Sheet".to_string()))?,
            )
        }
        None => None,
    };

    let users = store.list_users().await?;
    let progress = store.all_progress().await?;
    Ok(rank(users, &progress, sheet.as_ref(), query, allow_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{self, MemoryStore};
    use crate::db::NewProblem;
    use crate::types::{ProblemStatus, Visibility};
    use chrono::Utc;

    async fn solve(store: &MemoryStore, uid: &str, sheet: &Sheet, n: usize) {
        for i in 0..n {
            let p = store
                .insert_problem(NewProblem {
                    sheet_id: sheet.id,
                    title: format!("{} #{}", uid, i),
                    platform: "LeetCode".into(),
                    link: "https://leetcode.com/problems/two-sum".into(),
                    created_by_uid: None,
                })
                .await
                .unwrap();
            store
                .upsert_status(uid, sheet.id, p.id, ProblemStatus::Done, Utc::now())
                .await
                .unwrap();
        }
    }

    fn uids(rows: &[LeaderboardRow]) -> Vec<&str> {
        rows.iter().map(|r| r.uid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_default_excludes_admins_and_pending() {
        let store = MemoryStore::new();
        let sheet = store.insert_sheet("Green Sheet", Visibility::Public).await.unwrap();
        let allow_list = AdminAllowList::parse("coach@club.org");

        store.put_user(memory::user("alice", "alice@club.org"));
        let mut pending = memory::user("bob", "bob@club.org");
        pending.approved = false;
        store.put_user(pending);
        store.put_user(memory::user("coach", "coach@club.org"));
        let mut stored_admin = memory::user("dana", "dana@club.org");
        stored_admin.is_admin = true;
        store.put_user(stored_admin);

        solve(&store, "alice", &sheet, 1).await;
        solve(&store, "bob", &sheet, 3).await;
        solve(&store, "coach", &sheet, 5).await;

        let rows = leaderboard(&store, &LeaderboardQuery::default(), &allow_list).await.unwrap();
        assert_eq!(uids(&rows), vec!["alice"]);

        let everyone = LeaderboardQuery {
            include_admins: true,
            include_pending: true,
            ..Default::default()
        };
        let rows = leaderboard(&store, &everyone, &allow_list).await.unwrap();
        assert_eq!(uids(&rows), vec!["coach", "bob", "alice", "dana"]);
        assert_eq!(rows[0].done_count, 5);
    }

    #[tokio::test]
    async fn test_restricted_sheet_filter_excludes_users_without_access() {
        let store = MemoryStore::new();
        let public = store.insert_sheet("Green Sheet", Visibility::Public).await.unwrap();
        let restricted = store.insert_sheet("Team Sheet", Visibility::Restricted).await.unwrap();

        store.put_user(memory::user("alice", "alice@club.org"));
        store.put_user(memory::user("bob", "bob@club.org"));
        store.grant_sheet("bob", restricted.id).await.unwrap();

        // alice는 권한을 잃기 전에 풀었던 기록이 남아 있음
        solve(&store, "alice", &restricted, 4).await;
        solve(&store, "alice", &public, 2).await;
        solve(&store, "bob", &restricted, 1).await;

        let scoped = LeaderboardQuery {
            sheet_id: Some(restricted.id.to_string()),
            ..Default::default()
        };
        let rows = leaderboard(&store, &scoped, &AdminAllowList::default()).await.unwrap();
        assert_eq!(uids(&rows), vec!["bob"]);
        assert_eq!(rows[0].done_count, 1);

        let overall = leaderboard(&store, &LeaderboardQuery::default(), &AdminAllowList::default())
            .await
            .unwrap();
        assert_eq!(overall[0].uid, "alice");
        assert_eq!(overall[0].done_count, 6);
    }

    #[tokio::test]
    async fn test_unknown_sheet_filter_is_not_found() {
        let store = MemoryStore::new();
        let query = LeaderboardQuery {
            sheet_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(matches!(
            leaderboard(&store, &query, &AdminAllowList::default()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_filters_sort_and_limit() {
        let mut a = memory::user("a", "a@club.org");
        a.full_name = "Zed".into();
        a.department = "CSE".into();
        a.registration_number = "2021331001".into();
        let mut b = memory::user("b", "b@club.org");
        b.full_name = "amy".into();
        b.department = "cse".into();
        b.registration_number = "2022331002".into();
        let mut c = memory::user("c", "c@club.org");
        c.full_name = "Bob".into();
        c.department = "EEE".into();
        c.registration_number = "2021338003".into();

        let users = vec![a, b, c];
        let allow_list = AdminAllowList::default();

        let by_dept = LeaderboardQuery { department: Some("CSE".into()), ..Default::default() };
        assert_eq!(rank(users.clone(), &[], None, &by_dept, &allow_list).len(), 2);

        let by_batch = LeaderboardQuery { batch: Some("2021".into()), ..Default::default() };
        assert_eq!(uids(&rank(users.clone(), &[], None, &by_batch, &allow_list)), vec!["a", "c"]);

        let by_name = LeaderboardQuery {
            sort_by: Some(SortKey::Name),
            sort_dir: Some(SortDir::Asc),
            limit: Some(2),
            ..Default::default()
        };
        let rows = rank(users.clone(), &[], None, &by_name, &allow_list);
        assert_eq!(uids(&rows), vec!["b", "c"]);
        assert_eq!(rows[0].dept_batch, "cse-20");

        // 0 이하 limit은 무시
        let no_limit = LeaderboardQuery { limit: Some(0), ..Default::default() };
        assert_eq!(rank(users, &[], None, &no_limit, &allow_list).len(), 3);
    }

    #[test]
    fn test_dept_batch_without_registration() {
        let mut u = memory::user("u", "u@club.org");
        u.department = "CSE".into();
        assert_eq!(dept_batch(&u), "CSE");
        u.registration_number = "2019331042".into();
        assert_eq!(dept_batch(&u), "CSE-20");
    }
}
