//! Sheet / Problem catalog
//!
//! 관리자 CRUD와 사용자용 시트 목록. 연쇄 삭제는 트랜잭션 없이 정해진
//! 순서대로 실행되며, 중간에 실패하면 앞 단계까지만 반영됨.

use serde::Serialize;
use uuid::Uuid;

use super::access::{can_access, Viewer};
use crate::db::{NewProblem, Problem, ProblemPatch, Sheet, Store};
use crate::error::ApiError;
use crate::types::{ProblemStatus, Visibility};

pub const GREEN_SHEET: &str = "Green Sheet";

/// 시드 문제 (제목, 플랫폼, 링크)
const GREEN_SHEET_PROBLEMS: [(&str, &str, &str); 3] = [
    (
        "BeeCrowd 1000 - Hello World!",
        "BeeCrowd",
        "https://judge.beecrowd.com/en/problems/view/1000",
    ),
    (
        "BeeCrowd 2748 - Output 2",
        "BeeCrowd",
        "https://judge.beecrowd.com/en/problems/view/2748",
    ),
    (
        "BeeCrowd 2755 - Output 9",
        "BeeCrowd",
        "https://judge.beecrowd.com/en/problems/view/2755",
    ),
];

/// 응답용 문제 요약
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemView {
    pub id: Uuid,
    pub title: String,
    pub platform: String,
    pub link: String,
}

impl From<&Problem> for ProblemView {
    fn from(p: &Problem) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            platform: p.platform.clone(),
            link: p.link.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetView {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
}

impl From<&Sheet> for SheetView {
    fn from(s: &Sheet) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            visibility: s.visibility,
        }
    }
}

/// 사용자 대시보드용 시트
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetWithProgress {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub total_problems: usize,
    pub solved_count: usize,
    pub problems: Vec<ProblemView>,
}

/// 관리자 목록용 시트
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub problem_count: usize,
}

fn required(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(message.to_string()));
    }
    Ok(trimmed.to_string())
}

async fn existing_sheet(store: &dyn Store, id: Uuid) -> Result<Sheet, ApiError> {
    store
        .find_sheet(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sheet".to_string()))
}

// ============ User-facing ============

/// 볼 수 있는 시트 + 문제 + 풀이 수
///
/// 접근할 수 없는 restricted 시트는 목록에서 빠짐
pub async fn visible_sheets(
    store: &dyn Store,
    uid: &str,
    viewer: &Viewer,
) -> Result<Vec<SheetWithProgress>, ApiError> {
    let sheets = store.list_sheets().await?;
    let progress = store.progress_for_user(uid).await?;

    let mut result = Vec::with_capacity(sheets.len());
    for sheet in sheets.iter().filter(|s| can_access(viewer, Some(s))) {
        let problems = store.list_problems(sheet.id).await?;
        let solved_count = progress
            .iter()
            .filter(|p| p.sheet_id == sheet.id)
            .map(|p| p.count(ProblemStatus::Done))
            .sum();
        result.push(SheetWithProgress {
            id: sheet.id,
            name: sheet.name.clone(),
            visibility: sheet.visibility,
            total_problems: problems.len(),
            solved_count,
            problems: problems.iter().map(ProblemView::from).collect(),
        });
    }
    Ok(result)
}

// ============ Admin: sheets ============

pub async fn sheet_summaries(store: &dyn Store) -> Result<Vec<SheetSummary>, ApiError> {
    let sheets = store.list_sheets().await?;
    let mut result = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let problem_count = store.list_problems(sheet.id).await?.len();
        result.push(SheetSummary {
            id: sheet.id,
            name: sheet.name,
            visibility: sheet.visibility,
            problem_count,
        });
    }
    Ok(result)
}

pub async fn create_sheet(
    store: &dyn Store,
    name: &str,
    visibility: Option<Visibility>,
) -> Result<Sheet, ApiError> {
    let name = required(name, "name required")?;
    if store.find_sheet_by_name(&name).await?.is_some() {
        return Err(ApiError::Conflict("Sheet name already exists".to_string()));
    }
    let sheet = store.insert_sheet(&name, visibility.unwrap_or_default()).await?;
    tracing::info!(sheet_id = %sheet.id, name = %sheet.name, "Sheet created");
    Ok(sheet)
}

pub async fn sheet_with_problems(
    store: &dyn Store,
    id: Uuid,
) -> Result<(Sheet, Vec<Problem>), ApiError> {
    let sheet = existing_sheet(store, id).await?;
    let problems = store.list_problems(id).await?;
    Ok((sheet, problems))
}

/// 이름 변경 / 공개 범위 변경. 둘 다 없으면 ValidationError.
pub async fn update_sheet(
    store: &dyn Store,
    id: Uuid,
    name: Option<&str>,
    visibility: Option<Visibility>,
) -> Result<Sheet, ApiError> {
    let name = match name {
        Some(n) => Some(required(n, "name required")?),
        None => None,
    };
    if name.is_none() && visibility.is_none() {
        return Err(ApiError::ValidationError("name or visibility required".to_string()));
    }
    if let Some(n) = name.as_deref() {
        if let Some(other) = store.find_sheet_by_name(n).await? {
            if other.id != id {
                return Err(ApiError::Conflict("Sheet name already exists".to_string()));
            }
        }
    }

    store
        .update_sheet(id, name.as_deref(), visibility)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sheet".to_string()))
}

/// 문제 → 진행 기록 → 권한 → 시트 순서로 삭제
///
/// 해당 시트의 티어 배지와 수여 기록은 남겨 둠
pub async fn delete_sheet(store: &dyn Store, id: Uuid) -> Result<(), ApiError> {
    existing_sheet(store, id).await?;

    let problems = store.delete_problems_for_sheet(id).await?;
    let entries = store.delete_progress_for_sheet(id).await?;
    let grants = store.remove_sheet_grants(id).await?;
    store.delete_sheet(id).await?;

    tracing::info!(
        sheet_id = %id,
        problems,
        entries,
        grants,
        "Sheet deleted"
    );
    Ok(())
}

// ============ Admin: problems ============

#[derive(Debug, Clone, Default)]
pub struct ProblemInput {
    pub title: String,
    pub platform: String,
    pub link: String,
}

pub async fn add_problem(
    store: &dyn Store,
    sheet_id: Uuid,
    input: ProblemInput,
    admin_uid: &str,
) -> Result<Problem, ApiError> {
    let title = required(&input.title, "Missing fields")?;
    let platform = required(&input.platform, "Missing fields")?;
    let link = required(&input.link, "Missing fields")?;
    existing_sheet(store, sheet_id).await?;

    store
        .insert_problem(NewProblem {
            sheet_id,
            title,
            platform,
            link,
            created_by_uid: Some(admin_uid.to_string()),
        })
        .await
}

/// 문제 수정. 빈 문자열 필드는 변경 없음으로 취급.
///
/// `sheet_id`가 주어지면 대상 시트가 존재해야 함. 옮겨진 문제의 옛 진행 기록은
/// 원래 시트에 그대로 남음.
pub async fn update_problem(
    store: &dyn Store,
    id: Uuid,
    mut patch: ProblemPatch,
) -> Result<Problem, ApiError> {
    let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    patch.title = keep(patch.title);
    patch.platform = keep(patch.platform);
    patch.link = keep(patch.link);

    if let Some(target) = patch.sheet_id {
        existing_sheet(store, target).await?;
    }

    store
        .update_problem(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem".to_string()))
}

/// 진행 기록에서 먼저 제거한 뒤 문제 삭제
///
/// 중간에 실패해도 문제가 남아 있으므로 재시도로 마저 정리됨
pub async fn delete_problem(store: &dyn Store, id: Uuid) -> Result<(), ApiError> {
    if store.find_problem(id).await?.is_none() {
        return Err(ApiError::NotFound("Problem".to_string()));
    }
    let pruned = store.remove_problem_from_progress(id).await?;
    store.delete_problem(id).await?;
    tracing::info!(problem_id = %id, pruned, "Problem deleted");
    Ok(())
}

/// "Green Sheet"와 기본 문제 3개를 멱등하게 생성
pub async fn seed_green_sheet(store: &dyn Store, admin_uid: &str) -> Result<Sheet, ApiError> {
    let sheet = match store.find_sheet_by_name(GREEN_SHEET).await? {
        Some(sheet) => sheet,
        None => store.insert_sheet(GREEN_SHEET, Visibility::Public).await?,
    };

    let existing = store.list_problems(sheet.id).await?;
    for (title, platform, link) in GREEN_SHEET_PROBLEMS {
        if existing.iter().any(|p| p.title == title) {
            continue;
        }
        store
            .insert_problem(NewProblem {
                sheet_id: sheet.id,
                title: title.to_string(),
                platform: platform.to_string(),
                link: link.to_string(),
                created_by_uid: Some(admin_uid.to_string()),
            })
            .await?;
    }
    Ok(sheet)
}
