//! Bulk problem import
//!
//! 한 줄에 문제 하나: `title, platform, link`
//!
//! - 빈 줄은 무시
//! - 쉼표가 2개 미만이면 줄 단위 에러
//! - 세 번째 이후 조각은 모두 링크로 합침 (URL 안의 쉼표 허용)
//! - 제목은 대소문자 무시로 중복 검사, 같은 요청 안의 앞선 줄도 포함

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use super::catalog::ProblemView;
use crate::db::{NewProblem, Store};
use crate::error::ApiError;

const KNOWN_PLATFORMS: [(&str, &str); 4] = [
    ("beecrowd", "BeeCrowd"),
    ("codeforces", "Codeforces"),
    ("leetcode", "LeetCode"),
    ("codechef", "CodeChef"),
];

/// 알려진 플랫폼이면 표준 표기로, 아니면 앞뒤 공백만 제거
pub fn normalize_platform(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    KNOWN_PLATFORMS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub title: String,
    pub platform: String,
    pub link: String,
}

/// 한 줄 파싱. 에러 문자열은 그대로 응답에 실림.
pub fn parse_line(raw: &str) -> Result<ParsedLine, &'static str> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() < 3 {
        return Err("Expected 'title, platform, link'");
    }
    let title = parts[0].trim().to_string();
    let platform = normalize_platform(parts[1]);
    let link = parts[2..].join(",").trim().to_string();
    if title.is_empty() || platform.is_empty() || link.is_empty() {
        return Err("Missing title/platform/link");
    }
    Ok(ParsedLine { title, platform, link })
}

#[derive(Debug, Serialize)]
pub struct LineError {
    /// 1부터 시작
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub added_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub added: Vec<ProblemView>,
    pub errors: Vec<LineError>,
}

/// 시트에 문제 일괄 추가
pub async fn import(
    store: &dyn Store,
    sheet_id: Uuid,
    bulk_text: &str,
    admin_uid: &str,
) -> Result<ImportReport, ApiError> {
    if store.find_sheet(sheet_id).await?.is_none() {
        return Err(ApiError::NotFound("Sheet".to_string()));
    }

    let mut seen: HashSet<String> = store
        .list_problems(sheet_id)
        .await?
        .iter()
        .map(|p| p.title.trim().to_lowercase())
        .collect();

    let mut report = ImportReport::default();
    for (idx, raw) in bulk_text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let parsed = match parse_line(raw) {
            Ok(parsed) => parsed,
            Err(error) => {
                report.errors.push(LineError {
                    line: idx + 1,
                    error: error.to_string(),
                });
                continue;
            }
        };

        if !seen.insert(parsed.title.to_lowercase()) {
            report.skipped_count += 1;
            continue;
        }

        let created = store
            .insert_problem(NewProblem {
                sheet_id,
                title: parsed.title,
                platform: parsed.platform,
                link: parsed.link,
                created_by_uid: Some(admin_uid.to_string()),
            })
            .await?;
        report.added.push(ProblemView::from(&created));
    }

    report.added_count = report.added.len();
    report.error_count = report.errors.len();
    tracing::info!(
        %sheet_id,
        added = report.added_count,
        skipped = report.skipped_count,
        errors = report.error_count,
        "Bulk import finished"
    );
    Ok(report)
}
