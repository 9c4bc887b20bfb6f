use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::firebase_auth,
        handlers::ocr::scan_receipt,
        handlers::receipts::create_receipt,
        handlers::receipts::get_receipt,
        handlers::receipts::list_user_receipts,
        handlers::receipts::recent_user_receipts,
        handlers::receipts::count_user_receipts,
        handlers::receipts::delete_receipt,
        handlers::budgets::get_user_budget,
        handlers::budgets::list_user_budgets,
        handlers::budgets::save_budget,
        handlers::budgets::update_total_budget,
        handlers::budgets::update_category_budget,
        handlers::budgets::add_expense,
        handlers::budgets::delete_budget,
        handlers::promotions::list_promotions,
        handlers::promotions::get_promotion,
        handlers::promotions::get_by_promotion_id,
        handlers::promotions::promotions_by_category,
        handlers::promotions::promotions_by_merchant,
        handlers::promotions::match_promotions,
        handlers::promotions::promotions_for_receipt,
        handlers::promotions::search_promotions,
        handlers::promotions::active_promotions,
        handlers::promotions::create_promotion,
        handlers::promotions::update_promotion,
        handlers::promotions::delete_promotion,
        handlers::saved_promotions::save_promotion,
        handlers::saved_promotions::unsave_promotion,
        handlers::saved_promotions::is_promotion_saved,
        handlers::saved_promotions::saved_count,
        handlers::saved_promotions::list_saved_promotions,
        handlers::saved_promotions::list_saved_by_category,
        handlers::rewards::available_rewards,
        handlers::rewards::rewards_by_category,
        handlers::rewards::affordable_rewards,
        handlers::rewards::user_points,
        handlers::rewards::redemption_history,
        handlers::rewards::transactions,
        handlers::rewards::get_reward,
        handlers::rewards::award_points,
        handlers::rewards::redeem_reward,
        handlers::rewards::welcome_bonus,
        handlers::rewards::add_reward,
        handlers::rewards::update_reward,
        handlers::rewards::delete_reward,
        handlers::rewards::low_stock_rewards,
        handlers::rewards::update_redemption_status,
        handlers::rewards::add_delivery_info,
        handlers::user_points::get_user_points,
        handlers::user_points::get_transactions,
        handlers::user_points::get_transactions_by_type,
        handlers::user_points::get_transactions_by_source,
        handlers::user_rewards::list_user_rewards,
        handlers::user_rewards::user_rewards_by_status,
        handlers::user_rewards::recent_user_rewards,
        handlers::user_rewards::expiring_user_rewards,
    ),
    components(
        schemas(
            FirebaseAuthRequest,
            UserResponse,
            ExtractedItem,
            ExtractedReceipt,
            Receipt,
            CreateReceiptRequest,
            CreateReceiptResponse,
            CountResponse,
            Budget,
            BudgetCategory,
            AmountRequest,
            ExpenseRequest,
            Promotion,
            PromotionRequest,
            SavedPromotion,
            SavedStatusResponse,
            UserPoints,
            PointTransaction,
            TransactionType,
            PointSource,
            Reward,
            RewardRequest,
            UserReward,
            RedemptionStatus,
            StatusUpdateRequest,
            DeliveryInfoRequest,
            WelcomeBonusResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Identity linking API"),
        (name = "ocr", description = "Receipt scanning API"),
        (name = "receipts", description = "Receipt management API"),
        (name = "budgets", description = "Monthly budget API"),
        (name = "promotions", description = "Promotion catalog API"),
        (name = "saved-promotions", description = "Saved promotion API"),
        (name = "rewards", description = "Rewards and redemption API"),
        (name = "rewards-admin", description = "Reward administration API"),
        (name = "user-points", description = "Points ledger API"),
        (name = "user-rewards", description = "Redemption history API"),
    ),
    info(
        title = "PaperWorth Backend API",
        version = "1.0.0",
        description = "PaperWorth receipt scanning and personal finance REST API documentation"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let scan = &doc["paths"]["/api/ocr/scan"]["post"];
        assert!(scan["requestBody"]["content"]["multipart/form-data"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(doc["components"]["schemas"]["WelcomeBonusResponse"].is_object());
    }
}
