use crate::config::AdminConfig;
use crate::error::{AppError, AppResult};
use crate::external::IdentityVerifier;
use crate::models::VerifiedIdentity;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

// 公开路径配置，只做整路径或前缀匹配
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/swagger-ui",
                "/api-docs/openapi.json",
                "/login",
                "/api/login",
                "/api/users/firebase-auth",
            ],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/public/", "/api/public/"],
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self.exact_paths.contains(&path) {
            return true;
        }
        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

/// 管理端路由前缀，要求邮箱在管理员名单中
const ADMIN_PREFIX: &str = "/api/rewards/admin";

pub struct AuthMiddleware {
    verifier: Arc<dyn IdentityVerifier>,
    admin: AdminConfig,
}

impl AuthMiddleware {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, admin: AdminConfig) -> Self {
        Self { verifier, admin }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
            admin: Rc::new(self.admin.clone()),
            public_paths: Rc::new(PublicPaths::new()),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<dyn IdentityVerifier>,
    admin: Rc<AdminConfig>,
    public_paths: Rc<PublicPaths>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if self.public_paths.is_public_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            let error = AppError::AuthError("Missing access token".to_string());
            return Box::pin(async move { Err(error.into()) });
        };

        let service = self.service.clone();
        let verifier = self.verifier.clone();
        let admin = self.admin.clone();
        Box::pin(async move {
            let identity = match verifier.verify(&token).await {
                Ok(identity) => identity,
                Err(e) => {
                    log::warn!("Rejected bearer token on {}: {e}", req.path());
                    return Err(AppError::AuthError("Invalid access token".to_string()).into());
                }
            };

            if req.path().starts_with(ADMIN_PREFIX) {
                let allowed = identity
                    .email
                    .as_deref()
                    .is_some_and(|email| admin.is_admin(email));
                if !allowed {
                    log::warn!("User {} denied access to {}", identity.uid, req.path());
                    return Err(AppError::Forbidden.into());
                }
            }

            // 将身份添加到请求扩展中
            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}

/// 获取当前请求的已验证身份
pub fn current_identity(req: &HttpRequest) -> AppResult<VerifiedIdentity> {
    req.extensions()
        .get::<VerifiedIdentity>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path("/api/users/firebase-auth"));
        assert!(paths.is_public_path("/swagger-ui/index.html"));
        assert!(paths.is_public_path("/api-docs/openapi.json"));
        assert!(paths.is_public_path("/api/public/health"));
        assert!(!paths.is_public_path("/api/receipts"));
        assert!(!paths.is_public_path("/api/rewards/admin/low-stock"));
    }

    #[test]
    fn test_user_supplied_segments_are_not_public() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public_path(
            "/api/budgets/user/victim/month/2024-03/category/login-hack"
        ));
        assert!(!paths.is_public_path("/api/rewards/welcome-bonus/firebase-auth"));
        assert!(!paths.is_public_path("/api/promotions/merchant/x/public/y"));
        assert!(!paths.is_public_path("/api/users/firebase-auth/extra"));
    }
}
