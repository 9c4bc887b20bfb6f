//! Service graph assembly shared by the binary and the HTTP tests.

use actix_web::web;
use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::config::RewardsConfig;
use crate::external::{IdentityVerifier, OcrProvider};
use crate::handlers;
use crate::repositories::Repositories;
use crate::services::*;

#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub ocr: OcrService,
    pub receipts: ReceiptService,
    pub budgets: BudgetService,
    pub rewards: RewardsService,
    pub promotions: PromotionService,
    pub saved_promotions: SavedPromotionService,
}

impl AppServices {
    pub fn new(
        repos: &Repositories,
        cache: CacheLayer,
        verifier: Arc<dyn IdentityVerifier>,
        ocr_provider: Arc<dyn OcrProvider>,
        rewards_config: RewardsConfig,
    ) -> Self {
        let budgets = BudgetService::new(repos.budgets.clone(), cache.clone());
        let rewards = RewardsService::new(
            repos.receipts.clone(),
            repos.points.clone(),
            repos.ledger.clone(),
            repos.rewards.clone(),
            repos.user_rewards.clone(),
            rewards_config,
        );
        Self {
            auth: AuthService::new(repos.users.clone(), verifier),
            ocr: OcrService::new(ocr_provider),
            receipts: ReceiptService::new(repos.receipts.clone(), budgets.clone(), rewards.clone()),
            promotions: PromotionService::new(
                repos.promotions.clone(),
                repos.receipts.clone(),
                cache,
            ),
            saved_promotions: SavedPromotionService::new(
                repos.saved_promotions.clone(),
                repos.promotions.clone(),
            ),
            budgets,
            rewards,
        }
    }

    /// 注册服务实例与 `/api` 下的全部路由
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.auth.clone()))
            .app_data(web::Data::new(self.ocr.clone()))
            .app_data(web::Data::new(self.receipts.clone()))
            .app_data(web::Data::new(self.budgets.clone()))
            .app_data(web::Data::new(self.rewards.clone()))
            .app_data(web::Data::new(self.promotions.clone()))
            .app_data(web::Data::new(self.saved_promotions.clone()))
            .service(
                web::scope("/api")
                    .configure(handlers::users_config)
                    .configure(handlers::ocr_config)
                    .configure(handlers::receipts_config)
                    .configure(handlers::budgets_config)
                    .configure(handlers::promotions_config)
                    .configure(handlers::rewards_config)
                    .configure(handlers::user_points_config)
                    .configure(handlers::user_rewards_config),
            );
    }
}
