//! Badge / Tier evaluator
//!
//! 두 가지 관리자 작업:
//!
//! 1. **Generation**: 모든 시트에 60/80/100% 티어 배지를 보장 (조회 후 생성, 멱등)
//! 2. **Auto-award**: 승인된 사용자 × 문제가 있는 시트마다 최고 티어 하나만 유지
//!
//! 진행 상태 쓰기 경로에서는 호출되지 않음 (쓰기를 가볍게 유지).
//!
//! # Non-retraction
//!
//! 완료율이 60% 미만으로 떨어져도 기존 티어 배지는 회수하지 않음.
//! 다른 티어가 새로 충족될 때만 이전 티어 배지가 교체됨.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::activity::{self, Action};
use crate::db::{Badge, BadgePatch, NewBadge, Problem, Sheet, Store};
use crate::error::ApiError;
use crate::types::{BadgeKind, ProblemStatus, Tier};

/// 자동 수여 시 `awarded_by`
pub const SYSTEM_AWARDER: &str = "system";

pub const DEFAULT_BADGE_COLOR: &str = "#22c55e";
pub const DEFAULT_BADGE_ICON: &str = "🏆";

/// 완료율로 최고 티어 결정
///
/// 문제가 없는 시트는 티어 없음
pub fn qualifying_tier(solved: usize, total: usize) -> Option<Tier> {
    if total == 0 {
        return None;
    }
    let percentage = solved as f64 / total as f64 * 100.0;
    Tier::DESCENDING
        .into_iter()
        .find(|tier| percentage >= tier.threshold())
}

/// 시트에 현재 속한 문제 중 Done인 개수
///
/// 다른 시트로 옮겨진 문제의 옛 항목은 세지 않음
pub fn solved_in_sheet(
    statuses: &std::collections::HashMap<Uuid, ProblemStatus>,
    problems: &[Problem],
) -> usize {
    let ids: HashSet<Uuid> = problems.iter().map(|p| p.id).collect();
    statuses
        .iter()
        .filter(|(id, status)| **status == ProblemStatus::Done && ids.contains(id))
        .count()
}

fn tier_badge(sheet: &Sheet, tier: Tier) -> NewBadge {
    NewBadge {
        name: format!("{} - {}", sheet.name, tier.criteria()),
        description: format!("Completed {} of {}", tier.criteria(), sheet.name),
        kind: BadgeKind::Sheet,
        sheet_id: Some(sheet.id),
        criteria: Some(tier.criteria().to_string()),
        color: tier.color().to_string(),
        icon: tier.icon().to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub created: usize,
    pub total_sheets: usize,
}

/// 모든 시트에 티어 배지 3종 보장
pub async fn generate_sheet_badges(store: &dyn Store) -> Result<GenerationReport, ApiError> {
    let sheets = store.list_sheets().await?;
    tracing::info!("Generating tier badges for {} sheets", sheets.len());

    let mut created = 0;
    for sheet in &sheets {
        for tier in Tier::DESCENDING {
            if store.find_tier_badge(sheet.id, tier.criteria()).await?.is_some() {
                tracing::debug!(sheet = %sheet.name, criteria = tier.criteria(), "Badge already exists");
                continue;
            }
            store.insert_badge(tier_badge(sheet, tier)).await?;
            created += 1;
        }
    }

    tracing::info!("Tier badges created: {}", created);
    Ok(GenerationReport {
        created,
        total_sheets: sheets.len(),
    })
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardReport {
    pub awarded: usize,
    pub revoked: usize,
}

/// 승인된 사용자 전체에 대해 티어 배지 재계산
///
/// 순차 실행, 취소 없음. 같은 입력으로 다시 실행하면 같은 상태로 수렴.
pub async fn auto_award(store: &dyn Store) -> Result<AwardReport, ApiError> {
    let users: Vec<_> = store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.approved)
        .collect();
    let sheets = store.list_sheets().await?;
    tracing::info!(
        "Auto-awarding tier badges: {} approved users, {} sheets",
        users.len(),
        sheets.len()
    );

    // 시트별 문제 목록과 티어 배지는 사용자마다 다시 읽을 필요 없음
    let mut catalog: Vec<(Sheet, Vec<Problem>, Vec<Badge>)> = Vec::new();
    for sheet in sheets {
        let problems = store.list_problems(sheet.id).await?;
        if problems.is_empty() {
            tracing::debug!(sheet = %sheet.name, "Skipping sheet without problems");
            continue;
        }
        let badges = store.sheet_badges(sheet.id).await?;
        catalog.push((sheet, problems, badges));
    }

    let mut report = AwardReport::default();
    for user in &users {
        for (sheet, problems, badges) in &catalog {
            let progress = store.find_progress(&user.uid, sheet.id).await?;
            let solved = solved_in_sheet(&progress.statuses, problems);

            let Some(target) = qualifying_tier(solved, problems.len()) else {
                continue;
            };

            // 다른 티어 배지 회수 (사용자당 시트별 티어 배지는 최대 하나)
            for badge in badges.iter().filter(|b| b.tier() != Some(target)) {
                if store.delete_award(&user.uid, badge.id).await? {
                    tracing::info!(uid = %user.uid, sheet = %sheet.name, badge = %badge.name, "Tier badge replaced");
                    report.revoked += 1;
                }
            }

            let Some(badge) = badges.iter().find(|b| b.tier() == Some(target)) else {
                tracing::warn!(sheet = %sheet.name, criteria = target.criteria(), "Tier badge missing; run generation first");
                continue;
            };

            if store.insert_award(&user.uid, badge.id, Some(SYSTEM_AWARDER)).await? {
                activity::record(
                    store,
                    &user.uid,
                    Action::BadgeEarned,
                    json!({
                        "badgeId": badge.id.to_string(),
                        "sheetId": sheet.id.to_string(),
                        "criteria": target.criteria(),
                    }),
                )
                .await;
                tracing::info!(uid = %user.uid, badge = %badge.name, "Tier badge awarded");
                report.awarded += 1;
            }
        }
    }

    tracing::info!("Auto-award finished: {} awarded, {} revoked", report.awarded, report.revoked);
    Ok(report)
}

// ============ Manual badges ============

#[derive(Debug, Clone)]
pub struct ManualBadge {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

pub async fn create_manual(store: &dyn Store, input: ManualBadge) -> Result<Badge, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::ValidationError("name required".to_string()));
    }
    store
        .insert_badge(NewBadge {
            name: name.to_string(),
            description: input.description.unwrap_or_default(),
            kind: BadgeKind::Manual,
            sheet_id: None,
            criteria: None,
            color: input.color.unwrap_or_else(|| DEFAULT_BADGE_COLOR.to_string()),
            icon: input.icon.unwrap_or_else(|| DEFAULT_BADGE_ICON.to_string()),
        })
        .await
}

pub async fn update(store: &dyn Store, id: Uuid, patch: BadgePatch) -> Result<Badge, ApiError> {
    store
        .update_badge(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge".to_string()))
}

/// 수여 기록 먼저, 배지는 마지막
pub async fn delete(store: &dyn Store, id: Uuid) -> Result<(), ApiError> {
    if store.find_badge(id).await?.is_none() {
        return Err(ApiError::NotFound("Badge".to_string()));
    }
    let removed = store.delete_awards_for_badge(id).await?;
    store.delete_badge(id).await?;
    tracing::info!(badge_id = %id, awards_removed = removed, "Badge deleted");
    Ok(())
}

/// 관리자 수동 수여
pub async fn award(
    store: &dyn Store,
    user_uid: &str,
    badge_id: Uuid,
    admin_uid: &str,
) -> Result<(), ApiError> {
    store
        .find_badge(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge".to_string()))?;
    store
        .find_user(user_uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    if !store.insert_award(user_uid, badge_id, Some(admin_uid)).await? {
        return Err(ApiError::Conflict("Badge already awarded".to_string()));
    }

    activity::record(
        store,
        user_uid,
        Action::BadgeEarned,
        json!({ "badgeId": badge_id.to_string(), "awardedBy": admin_uid }),
    )
    .await;
    Ok(())
}

pub async fn revoke(store: &dyn Store, user_uid: &str, badge_id: Uuid) -> Result<(), ApiError> {
    store.delete_award(user_uid, badge_id).await?;
    Ok(())
}
