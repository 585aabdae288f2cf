use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Datelike, Local};
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::AppState;
use crate::entities::common::{ArchiveRequest, ErrorResponse, IncludeArchivedQuery};
use crate::entities::finance::{
    CategoryListResponse, CategoryRequest, CategoryResponseBody, CreateExpenseRequest, CreateSaleRequest,
    ExpenseListQuery, ExpenseListResponse, ExpenseResponseBody, OverviewQuery, OverviewResponse, SaleListQuery,
    SaleListResponse, SaleResponseBody, UpdateExpenseRequest,
};

#[utoipa::path(
    get,
    path = "/api/categories",
    params(IncludeArchivedQuery),
    responses((status = 200, description = "Expense categories", body = CategoryListResponse)),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeArchivedQuery>,
) -> ApiResult<Json<CategoryListResponse>> {
    let categories = state.services.finance.list_categories(query.include_archived).await?;
    Ok(Json(CategoryListResponse {
        success: true,
        categories: categories.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponseBody),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let category = state.services.finance.create_category(&request.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponseBody { success: true, category: category.into() }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = CategoryResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip(state, request))]
pub async fn rename_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> ApiResult<Json<CategoryResponseBody>> {
    request.validate()?;

    let category = state.services.finance.rename_category(id, &request.name).await?;
    Ok(Json(CategoryResponseBody { success: true, category: category.into() }))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}/archive",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = CategoryResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn archive_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<CategoryResponseBody>> {
    let category = state.services.finance.set_category_archived(id, request.archived).await?;
    Ok(Json(CategoryResponseBody { success: true, category: category.into() }))
}

#[utoipa::path(
    get,
    path = "/api/expenses",
    params(ExpenseListQuery),
    responses((status = 200, description = "Expenses", body = ExpenseListResponse)),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExpenseListQuery>,
) -> ApiResult<Json<ExpenseListResponse>> {
    let expenses = state.services.finance.list_expenses(query.into()).await?;
    Ok(Json(ExpenseListResponse {
        success: true,
        expenses: expenses.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = ExpenseResponseBody),
        (status = 400, description = "Invalid input or archived category", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip_all)]
pub async fn create_expense(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let expense = state.services.finance.create_expense(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponseBody { success: true, expense: expense.into() }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = ExpenseResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip(state, request))]
pub async fn update_expense(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateExpenseRequest>,
) -> ApiResult<Json<ExpenseResponseBody>> {
    request.validate()?;

    let expense = state.services.finance.update_expense(id, request.into()).await?;
    Ok(Json(ExpenseResponseBody { success: true, expense: expense.into() }))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{id}/archive",
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = ExpenseResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn archive_expense(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<ExpenseResponseBody>> {
    let expense = state.services.finance.set_expense_archived(id, request.archived).await?;
    Ok(Json(ExpenseResponseBody { success: true, expense: expense.into() }))
}

#[utoipa::path(
    get,
    path = "/api/sales",
    params(SaleListQuery),
    responses((status = 200, description = "Sales", body = SaleListResponse)),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn list_sales(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SaleListQuery>,
) -> ApiResult<Json<SaleListResponse>> {
    let sales = state.services.finance.list_sales(query.into()).await?;
    Ok(Json(SaleListResponse {
        success: true,
        sales: sales.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = SaleResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip_all)]
pub async fn record_sale(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let sale = state.services.finance.record_sale(request.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(SaleResponseBody { success: true, sale: sale.into() })))
}

/// Sales, expenses and outstanding balances for a year or one month of it
#[utoipa::path(
    get,
    path = "/api/financial-overview",
    params(OverviewQuery),
    responses(
        (status = 200, description = "Financial overview", body = OverviewResponse),
        (status = 400, description = "Invalid month", body = ErrorResponse)
    ),
    tag = "finance"
)]
#[instrument(skip(state))]
pub async fn financial_overview(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OverviewQuery>,
) -> ApiResult<Json<OverviewResponse>> {
    let year = query.year.unwrap_or_else(|| Local::now().year());
    debug!("Building financial overview for {} month {:?}", year, query.month);

    let overview = state.services.finance.overview(year, query.month).await?;
    Ok(Json(overview.into()))
}
