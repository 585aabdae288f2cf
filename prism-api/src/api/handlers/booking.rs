use axum::{extract::State, Json};
use chrono::Local;
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::extract::ApiQuery;
use crate::api::routes::AppState;
use crate::entities::booking::{CalendarQuery, CalendarResponse, DaySlotsResponse, SlotsQuery};
use crate::entities::common::ErrorResponse;

/// Slot availability for one day
#[utoipa::path(
    get,
    path = "/api/booking/slots",
    params(SlotsQuery),
    responses(
        (status = 200, description = "Slots with remaining capacity", body = DaySlotsResponse),
        (status = 400, description = "Invalid date", body = ErrorResponse)
    ),
    tag = "booking"
)]
#[instrument(skip(state))]
pub async fn day_slots(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> ApiResult<Json<DaySlotsResponse>> {
    let day = state
        .services
        .appointments
        .day_slots(query.date, Local::now().naive_local())
        .await?;
    Ok(Json(day.into()))
}

/// Available slot counts for every day of a month
#[utoipa::path(
    get,
    path = "/api/booking/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Month calendar", body = CalendarResponse),
        (status = 400, description = "Invalid year or month", body = ErrorResponse)
    ),
    tag = "booking"
)]
#[instrument(skip(state))]
pub async fn month_calendar(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> ApiResult<Json<CalendarResponse>> {
    let calendar = state
        .services
        .appointments
        .month_calendar(query.year, query.month, Local::now().naive_local())
        .await?;
    Ok(Json(calendar.into()))
}
