use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::google_credentials::load_service_account;
use crate::config::FirebaseConfig;
use crate::error::{AppError, AppResult};
use crate::models::VerifiedIdentity;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
/// 响应头缺少 max-age 时的缓存时长
const DEFAULT_JWKS_TTL_SECS: i64 = 3600;

/// 身份提供方端口：校验 bearer token 并返回用户身份
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Firebase ID token 校验（RS256，公钥来自 Google JWK 集合）
#[derive(Clone)]
pub struct FirebaseVerifier {
    http: Client,
    project_id: String,
    jwks_url: String,
    keys: Arc<RwLock<Option<(JwkSet, DateTime<Utc>)>>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String, jwks_url: String, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("paperworth-backend/firebase")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            project_id,
            jwks_url,
            keys: Arc::new(RwLock::new(None)),
        })
    }

    /// project_id 未显式配置时取自服务账号凭据
    pub fn from_config(cfg: &FirebaseConfig, timeout: Duration) -> AppResult<Self> {
        let project_id = match cfg.project_id.as_ref().filter(|p| !p.trim().is_empty()) {
            Some(p) => p.trim().to_string(),
            None => {
                let raw = cfg.credentials.as_deref().ok_or_else(|| {
                    AppError::ConfigError("Firebase project_id or credentials required".into())
                })?;
                load_service_account(raw)?.project_id.ok_or_else(|| {
                    AppError::ConfigError("Firebase credentials have no project_id".into())
                })?
            }
        };
        log::info!("Firebase token verification enabled for project {project_id}");
        Self::new(project_id, JWKS_URL.to_string(), timeout)
    }

    async fn key_set(&self) -> AppResult<JwkSet> {
        if let Some((set, expires_at)) = self.keys.read().await.as_ref() {
            if *expires_at > Utc::now() {
                return Ok(set.clone());
            }
        }

        let mut keys = self.keys.write().await;
        if let Some((set, expires_at)) = keys.as_ref() {
            if *expires_at > Utc::now() {
                return Ok(set.clone());
            }
        }

        let resp = self.http.get(&self.jwks_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Failed to fetch signing keys: HTTP {}",
                status.as_u16()
            )));
        }
        let ttl = resp
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_JWKS_TTL_SECS);
        let set: JwkSet = resp.json().await?;
        *keys = Some((set.clone(), Utc::now() + ChronoDuration::seconds(ttl)));
        log::info!("Refreshed identity signing keys ({} keys, ttl {ttl}s)", set.keys.len());
        Ok(set)
    }
}

fn parse_max_age(cache_control: &str) -> Option<i64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|d| d.strip_prefix("max-age="))
        .and_then(|v| v.parse().ok())
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        let header =
            decode_header(token).map_err(|_| AppError::AuthError("Invalid token".into()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::AuthError("Invalid token algorithm".into()));
        }
        let kid = header
            .kid
            .ok_or_else(|| AppError::AuthError("Token has no key id".into()))?;

        let set = self.key_set().await?;
        let jwk = set
            .find(&kid)
            .ok_or_else(|| AppError::AuthError("Unknown token signing key".into()))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| AppError::AuthError(format!("Unusable signing key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", self.project_id)]);

        let data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| AppError::AuthError(format!("Invalid token: {e}")))?;

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(19302)
        );
        assert_eq!(parse_max_age("no-cache"), None);
    }

    #[test]
    fn test_project_id_required() {
        let err = FirebaseVerifier::from_config(&FirebaseConfig::default(), Duration::from_secs(1));
        assert!(matches!(err, Err(AppError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_malformed_token_is_auth_error() {
        let verifier =
            FirebaseVerifier::new("p".into(), "http://127.0.0.1:9/jwks".into(), Duration::from_secs(1))
                .unwrap();
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AppError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_kid_is_auth_error_and_keys_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=600")
                    .set_body_json(serde_json::json!({ "keys": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let verifier =
            FirebaseVerifier::new("p".into(), format!("{}/jwks", server.uri()), Duration::from_secs(5))
                .unwrap();
        // header: {"alg":"RS256","kid":"k1","typ":"JWT"}
        let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImsxIiwidHlwIjoiSldUIn0.e30.c2ln";
        for _ in 0..2 {
            assert!(matches!(
                verifier.verify(token).await,
                Err(AppError::AuthError(_))
            ));
        }
    }
}
