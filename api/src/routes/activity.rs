//! Activity Log Endpoint (admin)

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{auth::AdminCaller, db::ActivityFilter, error::ApiError, AppState};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub user_uid: Option<String>,
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl ActivityQuery {
    fn into_filter(self) -> ActivityFilter {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        ActivityFilter {
            user_uid: non_empty(self.user_uid),
            action: non_empty(self.action),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            skip: self.skip.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: i64,
    pub user_uid: String,
    /// 이름 → 이메일 → "Unknown"
    pub user_name: String,
    pub action: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub logs: Vec<ActivityView>,
}

/// GET /activity
///
/// 최신순. `limit` 기본 100, 최대 500.
pub async fn list_activity(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let logs = state.store.list_activity(query.into_filter()).await?;

    let mut uids: Vec<String> = logs.iter().map(|l| l.user_uid.clone()).collect();
    uids.sort();
    uids.dedup();
    let names: HashMap<String, String> = state
        .store
        .find_users(&uids)
        .await?
        .into_iter()
        .map(|u| {
            let name = if !u.full_name.is_empty() {
                u.full_name
            } else {
                u.email.unwrap_or_default()
            };
            (u.uid, name)
        })
        .collect();

    let logs = logs
        .into_iter()
        .map(|l| ActivityView {
            user_name: names
                .get(&l.user_uid)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            id: l.id,
            user_uid: l.user_uid,
            action: l.action,
            metadata: l.metadata,
            timestamp: l.created_at,
        })
        .collect();

    Ok(Json(ActivityResponse { logs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{self, MemoryStore};
    use crate::routes::testing;
    use crate::services::activity::{record, Action};
    use serde_json::json;

    #[test]
    fn test_limit_is_clamped() {
        let filter = ActivityQuery { limit: Some(10_000), ..Default::default() }.into_filter();
        assert_eq!(filter.limit, MAX_LIMIT);
        let filter = ActivityQuery { skip: Some(-3), ..Default::default() }.into_filter();
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(filter.skip, 0);
    }

    #[tokio::test]
    async fn test_filtered_newest_first_with_names() {
        let store = MemoryStore::new();
        store.put_user(memory::user("coach", testing::ADMIN_EMAIL));
        store.put_user(memory::user("u1", "u1@club.org"));
        record(&store, "u1", Action::ProblemSolved, json!({ "n": 1 })).await;
        record(&store, "ghost", Action::ProblemSolved, json!({ "n": 2 })).await;
        record(&store, "u1", Action::BadgeEarned, json!({ "n": 3 })).await;
        let state = testing::state(store);

        let admin = testing::admin(&state, "coach").await;
        let Json(all) = list_activity(State(state.clone()), admin, Query(ActivityQuery::default()))
            .await
            .unwrap();
        assert_eq!(all.logs.len(), 3);
        assert_eq!(all.logs[0].metadata["n"], 3);
        assert_eq!(all.logs[1].user_name, "Unknown");
        assert_eq!(all.logs[2].user_name, "u1");

        let admin = testing::admin(&state, "coach").await;
        let query = ActivityQuery {
            user_uid: Some("u1".into()),
            action: Some("problem_solved".into()),
            ..Default::default()
        };
        let Json(filtered) = list_activity(State(state), admin, Query(query)).await.unwrap();
        assert_eq!(filtered.logs.len(), 1);
        assert_eq!(filtered.logs[0].metadata["n"], 1);
    }
}
