//! HTTP handler functions for the dashboard API.

use actix_web::{HttpResponse, web};
use curbside_database::{DbError, queries};
use curbside_server_models::{
    ApiBayMarker, ApiError, ApiErrorCode, ApiExistence, ApiHealth, ApiParkingMeta,
    ApiQuarterlyIndex, ExistsQueryParams, MarkerQueryParams,
};

use crate::AppState;

fn db_error(operation: &str, e: &DbError) -> HttpResponse {
    log::error!("Failed to {operation}: {e}");
    HttpResponse::InternalServerError().json(ApiError::database())
}

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match queries::ping(&state.gateway).await {
        Ok(ok) => HttpResponse::Ok().json(ApiHealth { ok, error: None }),
        Err(e) => {
            log::error!("Health check failed: {e}");
            HttpResponse::InternalServerError().json(ApiHealth {
                ok: false,
                error: Some(ApiErrorCode::DbError),
            })
        }
    }
}

/// `GET /api/vehicle/quarterly`
///
/// Returns the compounded quarterly vehicle registration index.
pub async fn quarterly(state: web::Data<AppState>) -> HttpResponse {
    match queries::query_quarterly_index(&state.gateway).await {
        Ok(rows) => {
            let index: Vec<ApiQuarterlyIndex> =
                rows.into_iter().map(ApiQuarterlyIndex::from).collect();
            HttpResponse::Ok().json(index)
        }
        Err(e) => db_error("query quarterly index", &e),
    }
}

/// `GET /api/parking/markers`
///
/// Returns bay statuses, from the latest snapshot or, when any temporal
/// filter is given, from the matching history.
pub async fn markers(
    state: web::Data<AppState>,
    params: web::Query<MarkerQueryParams>,
) -> HttpResponse {
    let criteria = params.to_criteria();

    match queries::query_markers(&state.gateway, &criteria).await {
        Ok(rows) => {
            let markers: Vec<ApiBayMarker> = rows.into_iter().map(ApiBayMarker::from).collect();
            HttpResponse::Ok().json(markers)
        }
        Err(e) => db_error("query parking markers", &e),
    }
}

/// `GET /api/parking/meta`
///
/// Returns the distinct years, months, streets and zones for the filter
/// controls.
pub async fn meta(state: web::Data<AppState>) -> HttpResponse {
    match queries::query_parking_meta(&state.gateway).await {
        Ok(meta) => HttpResponse::Ok().json(ApiParkingMeta::from(meta)),
        Err(e) => db_error("query parking metadata", &e),
    }
}

/// `GET /api/parking/exists`
pub async fn exists(
    state: web::Data<AppState>,
    params: web::Query<ExistsQueryParams>,
) -> HttpResponse {
    let street = params.street();

    match queries::check_existence(&state.gateway, street.as_deref(), params.zone()).await {
        Ok(check) => HttpResponse::Ok().json(ApiExistence::from(check)),
        Err(e) => db_error("check street/zone existence", &e),
    }
}
