use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::BudgetService;

fn budget_ok(budget: Budget) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": budget
    }))
}

#[utoipa::path(
    get,
    path = "/api/budgets/user/{user_id}/month/{month_year}",
    tag = "budgets",
    params(
        ("user_id" = String, Path, description = "Owner id"),
        ("month_year" = String, Path, description = "Month key YYYY-MM")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Budget, created from the default template when absent", body = Budget),
        (status = 400, description = "Invalid month key")
    )
)]
pub async fn get_user_budget(
    budget_service: web::Data<BudgetService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (user_id, month_year) = path.into_inner();
    match budget_service.get_user_budget(&user_id, &month_year).await {
        Ok(budget) => Ok(budget_ok(budget)),
        Err(e) => {
            log::error!("Failed to load budget {user_id}/{month_year}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/budgets/user/{user_id}",
    tag = "budgets",
    params(("user_id" = String, Path, description = "Owner id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All monthly budgets of the user", body = [Budget])
    )
)]
pub async fn list_user_budgets(
    budget_service: web::Data<BudgetService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match budget_service.list_user_budgets(&user_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => {
            log::error!("Failed to list budgets for user {user_id}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/budgets",
    tag = "budgets",
    request_body = Budget,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Budget saved", body = Budget),
        (status = 400, description = "Invalid budget")
    )
)]
pub async fn save_budget(
    budget_service: web::Data<BudgetService>,
    request: web::Json<Budget>,
) -> Result<HttpResponse> {
    let budget = request.into_inner();
    let (user_id, month_year) = (budget.user_id.clone(), budget.month_year.clone());
    log::info!("Saving budget {user_id}/{month_year}");
    match budget_service.save_budget(budget).await {
        Ok(saved) => {
            log::info!("Budget {} saved for {user_id}/{month_year}", saved.id);
            Ok(budget_ok(saved))
        }
        Err(e) => {
            log::error!("Failed to save budget {user_id}/{month_year}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/budgets/user/{user_id}/month/{month_year}/total",
    tag = "budgets",
    request_body = AmountRequest,
    params(
        ("user_id" = String, Path, description = "Owner id"),
        ("month_year" = String, Path, description = "Month key YYYY-MM")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Total updated, categories rescaled", body = Budget)
    )
)]
pub async fn update_total_budget(
    budget_service: web::Data<BudgetService>,
    path: web::Path<(String, String)>,
    request: web::Json<AmountRequest>,
) -> Result<HttpResponse> {
    let (user_id, month_year) = path.into_inner();
    let amount = request.amount;
    log::info!("Updating total budget {user_id}/{month_year} to {amount}");
    match budget_service
        .update_total_budget(&user_id, &month_year, amount)
        .await
    {
        Ok(budget) => {
            log::info!("Total budget {} updated", budget.id);
            Ok(budget_ok(budget))
        }
        Err(e) => {
            log::error!("Failed to update total budget {user_id}/{month_year}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/budgets/user/{user_id}/month/{month_year}/category/{category}",
    tag = "budgets",
    request_body = AmountRequest,
    params(
        ("user_id" = String, Path, description = "Owner id"),
        ("month_year" = String, Path, description = "Month key YYYY-MM"),
        ("category" = String, Path, description = "Category name")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Category budget updated", body = Budget)
    )
)]
pub async fn update_category_budget(
    budget_service: web::Data<BudgetService>,
    path: web::Path<(String, String, String)>,
    request: web::Json<AmountRequest>,
) -> Result<HttpResponse> {
    let (user_id, month_year, category) = path.into_inner();
    log::info!("Updating {category} budget {user_id}/{month_year}");
    match budget_service
        .update_category_budget(&user_id, &month_year, &category, request.amount)
        .await
    {
        Ok(budget) => Ok(budget_ok(budget)),
        Err(e) => {
            log::error!("Failed to update {category} budget {user_id}/{month_year}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/budgets/user/{user_id}/month/{month_year}/expense",
    tag = "budgets",
    request_body = ExpenseRequest,
    params(
        ("user_id" = String, Path, description = "Owner id"),
        ("month_year" = String, Path, description = "Month key YYYY-MM")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Expense applied", body = Budget)
    )
)]
pub async fn add_expense(
    budget_service: web::Data<BudgetService>,
    path: web::Path<(String, String)>,
    request: web::Json<ExpenseRequest>,
) -> Result<HttpResponse> {
    let (user_id, month_year) = path.into_inner();
    let ExpenseRequest { category, amount } = request.into_inner();
    log::info!("Adding expense {amount} to {category} for {user_id}/{month_year}");
    match budget_service
        .add_expense(&user_id, &month_year, &category, amount)
        .await
    {
        Ok(budget) => Ok(budget_ok(budget)),
        Err(e) => {
            log::error!("Failed to add expense for {user_id}/{month_year}: {e}");
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/budgets/{id}",
    tag = "budgets",
    params(("id" = String, Path, description = "Budget id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Budget deleted"),
        (status = 404, description = "Budget not found")
    )
)]
pub async fn delete_budget(
    budget_service: web::Data<BudgetService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let budget_id = path.into_inner();
    log::info!("Deleting budget {budget_id}");
    match budget_service.delete_budget(&budget_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Budget deleted successfully"
        }))),
        Err(e) => {
            log::error!("Failed to delete budget {budget_id}: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn budgets_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/budgets")
            .route("", web::post().to(save_budget))
            .route("/user/{user_id}", web::get().to(list_user_budgets))
            .route(
                "/user/{user_id}/month/{month_year}",
                web::get().to(get_user_budget),
            )
            .route(
                "/user/{user_id}/month/{month_year}/total",
                web::put().to(update_total_budget),
            )
            .route(
                "/user/{user_id}/month/{month_year}/category/{category}",
                web::put().to(update_category_budget),
            )
            .route(
                "/user/{user_id}/month/{month_year}/expense",
                web::post().to(add_expense),
            )
            .route("/{id}", web::delete().to(delete_budget)),
    );
}
