//! Sheet access control
//!
//! 관리자 여부는 요청마다 한 번만 계산 (`저장된 is_admin` OR `allow-list 이메일`)
//! 되어 `Viewer`에 담겨 하위 로직으로 전달됨. allow-list를 여러 곳에서
//! 다시 확인하지 않음.

use std::collections::HashSet;

use uuid::Uuid;

use crate::config::AdminAllowList;
use crate::db::{Sheet, User};
use crate::types::Visibility;

/// 접근 판단에 필요한 사용자 측 정보
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub is_admin: bool,
    pub allowed_sheets: HashSet<Uuid>,
}

impl Viewer {
    /// 비로그인 사용자 또는 레코드가 없는 사용자
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 사용자 레코드(없을 수 있음)와 이메일로 Viewer 구성
    ///
    /// 레코드가 없으면 허용 목록은 비어 있고 관리자 여부는 allow-list로만 결정
    pub fn resolve(user: Option<&User>, email: Option<&str>, allow_list: &AdminAllowList) -> Self {
        let email = email.or_else(|| user.and_then(|u| u.email.as_deref()));
        let stored_admin = user.map(|u| u.is_admin).unwrap_or(false);
        Self {
            is_admin: stored_admin || allow_list.contains(email),
            allowed_sheets: user.map(User::grants).unwrap_or_default(),
        }
    }
}

/// 사용자 레코드 기준 관리자 여부 (저장 플래그 OR allow-list)
pub fn is_admin(user: &User, allow_list: &AdminAllowList) -> bool {
    user.is_admin || allow_list.contains(user.email.as_deref())
}

/// 시트 접근 가능 여부
///
/// - 시트 없음 → false
/// - public → 항상 true
/// - restricted → 관리자이거나 허용 목록에 포함된 경우만
pub fn can_access(viewer: &Viewer, sheet: Option<&Sheet>) -> bool {
    match sheet {
        None => false,
        Some(sheet) => match sheet.visibility {
            Visibility::Public => true,
            Visibility::Restricted => viewer.is_admin || viewer.allowed_sheets.contains(&sheet.id),
        },
    }
}
