//! Progress write path
//!
//! 상태 쓰기 순서: 상태 값 검증 → 시트 접근 확인 → 문제 소속 확인 →
//! 원자적 upsert → (Done이면) 활동 로그

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use super::access::{can_access, Viewer};
use super::activity::{self, Action};
use crate::db::{Sheet, Store};
use crate::error::ApiError;
use crate::types::ProblemStatus;

/// 접근 가능한 시트를 찾아 반환. 없으면 NotFound, 권한 없으면 Forbidden.
pub async fn accessible_sheet(
    store: &dyn Store,
    viewer: &Viewer,
    sheet_id: Uuid,
) -> Result<Sheet, ApiError> {
    let sheet = store
        .find_sheet(sheet_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sheet".to_string()))?;

    if !can_access(viewer, Some(&sheet)) {
        return Err(ApiError::Forbidden("No access to this sheet".to_string()));
    }
    Ok(sheet)
}

/// 사용자의 시트별 상태 맵
pub async fn statuses(
    store: &dyn Store,
    uid: &str,
    viewer: &Viewer,
    sheet_id: Uuid,
) -> Result<HashMap<Uuid, ProblemStatus>, ApiError> {
    accessible_sheet(store, viewer, sheet_id).await?;
    Ok(store.find_progress(uid, sheet_id).await?.statuses)
}

/// 문제 상태 설정
///
/// 같은 값을 다시 써도 시각은 항상 갱신되고, Done은 매번 `problem_solved`를 기록함
pub async fn set_status(
    store: &dyn Store,
    uid: &str,
    viewer: &Viewer,
    sheet_id: Uuid,
    problem_id: Uuid,
    raw_status: &str,
    at: DateTime<Utc>,
) -> Result<ProblemStatus, ApiError> {
    let status: ProblemStatus = raw_status.parse()?;

    accessible_sheet(store, viewer, sheet_id).await?;

    let problem = store
        .find_problem(problem_id)
        .await?
        .filter(|p| p.sheet_id == sheet_id)
        .ok_or_else(|| ApiError::NotFound("Problem".to_string()))?;

    store.upsert_status(uid, sheet_id, problem.id, status, at).await?;
    tracing::debug!(uid, %sheet_id, %problem_id, %status, "Progress updated");

    if status == ProblemStatus::Done {
        activity::record(
            store,
            uid,
            Action::ProblemSolved,
            json!({ "problemId": problem.id.to_string(), "sheetId": sheet_id.to_string() }),
        )
        .await;
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminAllowList;
    use crate::db::memory::{self, MemoryStore};
    use crate::db::NewProblem;
    use crate::types::Visibility;
    use chrono::Duration;

    async fn fixture(visibility: Visibility) -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let sheet = store.insert_sheet("Green Sheet", visibility).await.unwrap();
        let problem = store
            .insert_problem(NewProblem {
                sheet_id: sheet.id,
                title: "Hello World".into(),
                platform: "BeeCrowd".into(),
                link: "https://judge.beecrowd.com/en/problems/view/1000".into(),
                created_by_uid: None,
            })
            .await
            .unwrap();
        store.put_user(memory::user("u1", "u1@club.org"));
        (store, sheet.id, problem.id)
    }

    async fn viewer_for(store: &MemoryStore, uid: &str) -> Viewer {
        let user = store.find_user(uid).await.unwrap();
        Viewer::resolve(user.as_ref(), None, &AdminAllowList::default())
    }

    #[tokio::test]
    async fn test_done_roundtrip_and_repeat_refreshes_timestamp() {
        let (store, sheet_id, problem_id) = fixture(Visibility::Public).await;
        let viewer = Viewer::anonymous();
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(30);

        set_status(&store, "u1", &viewer, sheet_id, problem_id, "Done", t1).await.unwrap();
        let map = statuses(&store, "u1", &viewer, sheet_id).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&problem_id], ProblemStatus::Done);

        set_status(&store, "u1", &viewer, sheet_id, problem_id, "Done", t2).await.unwrap();
        let progress = store.find_progress("u1", sheet_id).await.unwrap();
        assert_eq!(progress.statuses.len(), 1);
        assert_eq!(progress.status_times[&problem_id], t2);

        // 반복 Done도 매번 기록됨
        assert_eq!(store.activity_count("problem_solved"), 2);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected_without_write() {
        let (store, sheet_id, problem_id) = fixture(Visibility::Public).await;
        let err = set_status(&store, "u1", &Viewer::anonymous(), sheet_id, problem_id, "Solved", Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(store.find_progress("u1", sheet_id).await.unwrap().statuses.is_empty());
    }

    #[tokio::test]
    async fn test_restricted_sheet_requires_grant() {
        let (store, sheet_id, problem_id) = fixture(Visibility::Restricted).await;

        let viewer = viewer_for(&store, "u1").await;
        let err = set_status(&store, "u1", &viewer, sheet_id, problem_id, "Tried", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(matches!(
            statuses(&store, "u1", &viewer, sheet_id).await,
            Err(ApiError::Forbidden(_))
        ));

        store.grant_sheet("u1", sheet_id).await.unwrap();
        let viewer = viewer_for(&store, "u1").await;
        set_status(&store, "u1", &viewer, sheet_id, problem_id, "Tried", Utc::now())
            .await
            .unwrap();
        // Tried는 활동 로그 없음
        assert_eq!(store.activity_count("problem_solved"), 0);
    }

    #[tokio::test]
    async fn test_problem_from_other_sheet_is_not_found() {
        let (store, sheet_id, _) = fixture(Visibility::Public).await;
        let other = store.insert_sheet("Blue Sheet", Visibility::Public).await.unwrap();
        let stray = store
            .insert_problem(NewProblem {
                sheet_id: other.id,
                title: "Elsewhere".into(),
                platform: "Codeforces".into(),
                link: "https://codeforces.com/problemset/problem/4/A".into(),
                created_by_uid: None,
            })
            .await
            .unwrap();

        let err = set_status(&store, "u1", &Viewer::anonymous(), sheet_id, stray.id, "Done", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
