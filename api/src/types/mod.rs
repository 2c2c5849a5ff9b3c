//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 도메인 타입 정의

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// 단순 성공 응답 (`{"ok": true}`)
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// 문제 풀이 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemStatus {
    Unopened,
    Tried,
    Done,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Unopened => "Unopened",
            ProblemStatus::Tried => "Tried",
            ProblemStatus::Done => "Done",
        }
    }
}

impl FromStr for ProblemStatus {
    type Err = ApiError;

    /// 대소문자까지 정확히 일치해야 함 (자동 보정 없음)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unopened" => Ok(ProblemStatus::Unopened),
            "Tried" => Ok(ProblemStatus::Tried),
            "Done" => Ok(ProblemStatus::Done),
            _ => Err(ApiError::ValidationError("Invalid status".to_string())),
        }
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 시트 공개 범위
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Restricted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Restricted => "restricted",
        }
    }
}

impl FromStr for Visibility {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "restricted" => Ok(Visibility::Restricted),
            other => Err(ApiError::ValidationError(format!("Invalid visibility: {}", other))),
        }
    }
}

/// 배지 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    /// 관리자가 직접 만든 배지
    Manual,
    /// 시트 완료율 티어 배지
    Sheet,
}

impl BadgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::Manual => "manual",
            BadgeKind::Sheet => "sheet",
        }
    }
}

impl FromStr for BadgeKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(BadgeKind::Manual),
            "sheet" => Ok(BadgeKind::Sheet),
            other => Err(ApiError::ValidationError(format!("Invalid badge type: {}", other))),
        }
    }
}

/// 시트 완료율 티어 (60% / 80% / 100%)
///
/// 순서가 의미를 가짐: `Bronze < Silver < Gold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// 높은 티어부터
    pub const DESCENDING: [Tier; 3] = [Tier::Gold, Tier::Silver, Tier::Bronze];

    /// 배지에 저장되는 criteria 문자열
    pub fn criteria(&self) -> &'static str {
        match self {
            Tier::Bronze => "60%",
            Tier::Silver => "80%",
            Tier::Gold => "100%",
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            Tier::Bronze => 60.0,
            Tier::Silver => 80.0,
            Tier::Gold => 100.0,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Tier::Bronze => "#cd7f32",
            Tier::Silver => "#a3a3a3",
            Tier::Gold => "#fbbf24",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Tier::Bronze => "🥉",
            Tier::Silver => "🥈",
            Tier::Gold => "🥇",
        }
    }

    pub fn from_criteria(criteria: &str) -> Option<Self> {
        Tier::DESCENDING.into_iter().find(|t| t.criteria() == criteria)
    }
}

/// 외부 노출용 opaque 식별자를 UUID로 파싱
///
/// 파싱 불가능한 식별자는 존재하지 않는 리소스로 취급
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(resource.to_string()))
}
