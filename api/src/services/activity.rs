//! Activity log
//!
//! append-only. 기록 실패는 요청을 실패시키지 않고 경고 로그만 남김.

use serde_json::Value;

use crate::db::Store;

/// 활동 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ProblemSolved,
    BadgeEarned,
    UserApproved,
    UserUnapproved,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ProblemSolved => "problem_solved",
            Action::BadgeEarned => "badge_earned",
            Action::UserApproved => "user_approved",
            Action::UserUnapproved => "user_unapproved",
        }
    }
}

/// best-effort 기록
pub async fn record(store: &dyn Store, user_uid: &str, action: Action, metadata: Value) {
    if let Err(e) = store.append_activity(user_uid, action.as_str(), metadata).await {
        tracing::warn!(user_uid, action = action.as_str(), "Failed to log activity: {:?}", e);
    }
}
