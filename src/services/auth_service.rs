use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::external::IdentityVerifier;
use crate::models::{FirebaseAuthRequest, NewUser, User, UserResponse};
use crate::repositories::UserRepository;
use crate::utils::placeholder_password_hash;

const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { users, verifier }
    }

    /// 校验 Firebase ID token，并将 uid 关联到本地用户（必要时创建）
    pub async fn firebase_auth(&self, req: FirebaseAuthRequest) -> AppResult<UserResponse> {
        if req.uid.trim().is_empty() || req.id_token.trim().is_empty() {
            return Err(AppError::ValidationError("uid and idToken are required".into()));
        }
        if req.email.trim().is_empty() {
            return Err(AppError::ValidationError("email is required".into()));
        }

        let identity = self.verifier.verify(&req.id_token).await?;
        if identity.uid != req.uid {
            log::warn!("Token uid does not match requested uid {}", req.uid);
            return Err(AppError::AuthError("Token does not belong to this user".into()));
        }

        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let email = req.email.trim();

        // 1. 已关联
        if let Some(user) = self.users.find_by_firebase_id(&req.uid).await? {
            let user = self.refresh_name(user, name).await?;
            return Ok(user.into());
        }

        // 2. 同邮箱的已有账号，关联 uid
        if let Some(mut user) = self.users.find_by_email(email).await? {
            user.firebase_id = Some(req.uid.clone());
            if let Some(name) = name {
                user.name = name.to_string();
            }
            let user = self.users.update(&user).await?;
            log::info!("Linked firebase uid to existing user {}", user.id);
            return Ok(user.into());
        }

        // 3. 新建
        let new_user = NewUser {
            email: email.to_string(),
            name: name.unwrap_or(DEFAULT_DISPLAY_NAME).to_string(),
            firebase_id: Some(req.uid.clone()),
            password_hash: placeholder_password_hash()?,
        };
        match self.users.insert(new_user).await {
            Ok(user) => {
                log::info!("Provisioned user {} from firebase sign-in", user.id);
                Ok(user.into())
            }
            // 并发注册同一邮箱
            Err(AppError::Conflict(_)) => {
                let user = self.users.find_by_email(email).await?.ok_or_else(|| {
                    AppError::InternalError("User vanished after duplicate insert".into())
                })?;
                Ok(user.into())
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_name(&self, mut user: User, name: Option<&str>) -> AppResult<User> {
        match name {
            Some(name) if name != user.name => {
                user.name = name.to_string();
                self.users.update(&user).await
            }
            _ => Ok(user),
        }
    }
}
