//! Identity resolution
//!
//! Bearer 토큰 → 안정적인 외부 uid + 이메일.
//!
//! 서명 검증은 직접 하지 않고 신원 제공자의 account lookup 엔드포인트에
//! 위임함. 제공자가 토큰을 거부하면 401, 연결 자체가 안 되면 503.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

/// 검증된 호출자 신원
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, ApiError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

fn identity_from_lookup(body: LookupResponse) -> Result<Identity, ApiError> {
    let user = body.users.into_iter().next().ok_or(ApiError::Unauthorized)?;
    if user.local_id.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    Ok(Identity {
        uid: user.local_id,
        email: user.email.filter(|e| !e.is_empty()),
        name: user.display_name.filter(|n| !n.is_empty()),
    })
}

/// 검증 결과 단기 캐시
///
/// 대시보드는 화면마다 여러 요청을 보내므로 같은 토큰을 반복 조회하지 않음
struct TokenCache {
    entries: RwLock<HashMap<String, (Identity, Instant)>>,
    ttl: Duration,
}

impl TokenCache {
    const MAX_ENTRIES: usize = 4096;

    fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn get(&self, token: &str) -> Option<Identity> {
        let entries = self.entries.read().ok()?;
        entries
            .get(token)
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(identity, _)| identity.clone())
    }

    fn put(&self, token: &str, identity: Identity) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= Self::MAX_ENTRIES {
                let ttl = self.ttl;
                entries.retain(|_, (_, at)| at.elapsed() < ttl);
                if entries.len() >= Self::MAX_ENTRIES {
                    entries.clear();
                }
            }
            entries.insert(token.to_string(), (identity, Instant::now()));
        }
    }
}

/// Firebase account lookup 기반 검증기
pub struct FirebaseIdentity {
    client: reqwest::Client,
    lookup_url: String,
    api_key: String,
    cache: TokenCache,
}

impl FirebaseIdentity {
    /// 캐시 유효 시간
    const CACHE_TTL_SECS: u64 = 60;

    pub fn new(lookup_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            lookup_url: lookup_url.to_string(),
            api_key: api_key.to_string(),
            cache: TokenCache::new(Duration::from_secs(Self::CACHE_TTL_SECS)),
        })
    }

    async fn lookup(&self, token: &str) -> Result<Identity, ApiError> {
        let resp = self
            .client
            .post(&self.lookup_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Identity provider unreachable: {:?}", e);
                ApiError::ServiceUnavailable("Identity provider".to_string())
            })?;

        let status = resp.status();
        if status.is_server_error() {
            tracing::error!(%status, "Identity provider error");
            return Err(ApiError::ServiceUnavailable("Identity provider".to_string()));
        }
        if !status.is_success() {
            tracing::debug!(%status, "Token rejected by identity provider");
            return Err(ApiError::Unauthorized);
        }

        let body: LookupResponse = resp.json().await.map_err(|e| {
            tracing::warn!("Malformed identity lookup response: {:?}", e);
            ApiError::Unauthorized
        })?;
        identity_from_lookup(body)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseIdentity {
    async fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        if token.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        if let Some(identity) = self.cache.get(token) {
            return Ok(identity);
        }
        let identity = self.lookup(token).await?;
        self.cache.put(token, identity.clone());
        Ok(identity)
    }
}

/// 테스트용: 미리 등록한 토큰만 통과
#[cfg(test)]
pub struct StaticIdentity {
    tokens: HashMap<String, Identity>,
}

#[cfg(test)]
impl StaticIdentity {
    pub fn new() -> Self {
        Self { tokens: HashMap::new() }
    }

    pub fn with(mut self, token: &str, uid: &str, email: Option<&str>) -> Self {
        self.tokens.insert(
            token.to_string(),
            Identity {
                uid: uid.to_string(),
                email: email.map(str::to_string),
                name: None,
            },
        );
        self
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        self.tokens.get(token).cloned().ok_or(ApiError::Unauthorized)
    }
}
