#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use paperworth_backend::app::AppServices;
use paperworth_backend::cache::CacheLayer;
use paperworth_backend::config::{AdminConfig, RewardsConfig};
use paperworth_backend::external::{IdentityVerifier, OcrProvider};
use paperworth_backend::models::VerifiedIdentity;
use paperworth_backend::repositories::Repositories;
use paperworth_backend::{AppError, AppResult};

pub const ADMIN_EMAIL: &str = "ops@paperworth.app";

/// token 形如 `token-<uid>`，uid 为 `admin` 时带管理员邮箱
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        let uid = token
            .strip_prefix("token-")
            .ok_or_else(|| AppError::AuthError("bad token".into()))?;
        let email = if uid == "admin" {
            ADMIN_EMAIL.to_string()
        } else {
            format!("{uid}@example.com")
        };
        Ok(VerifiedIdentity {
            uid: uid.to_string(),
            email: Some(email),
            name: None,
        })
    }
}

pub struct FakeOcr(pub &'static str);

#[async_trait]
impl OcrProvider for FakeOcr {
    async fn detect_text(&self, _png: &[u8]) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

pub const MCDONALDS_TEXT: &str = "MCDONALD'S\nBig Mac $6.50\nFries $3.00\nTOTAL $12.50\nDATE: 03/04/2024";

pub fn admin_config() -> AdminConfig {
    AdminConfig {
        emails: vec![ADMIN_EMAIL.to_string()],
    }
}

pub fn build_services() -> (AppServices, Repositories) {
    let repos = Repositories::in_memory();
    let services = AppServices::new(
        &repos,
        CacheLayer::in_memory(Duration::from_secs(60)),
        Arc::new(FakeVerifier),
        Arc::new(FakeOcr(MCDONALDS_TEXT)),
        RewardsConfig::default(),
    );
    (services, repos)
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
