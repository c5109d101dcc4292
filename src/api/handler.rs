use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::models::*;
use crate::chain::AddressCodec;
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerRepository;
use crate::middleware::{RateLimitLayer, ValidatedJson};
use crate::reconciliation::{dispatch_cycle, ReconciliationScanner};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerRepository>,
    pub scanner: Arc<ReconciliationScanner>,
    pub codec: AddressCodec,
    pub scan_limiter: RateLimitLayer,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match state.ledger.ping().await {
        Ok(()) => (StatusCode::OK, "up"),
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        database: database.to_string(),
        timestamp: Utc::now(),
    };

    (status, Json(body))
}

/// GET /api/v1/watermark
pub async fn get_watermark(State(state): State<AppState>) -> AppResult<Json<WatermarkResponse>> {
    let chain_id = state.scanner.chain_id();
    let watermark = state
        .scanner
        .watermark()
        .await?
        .ok_or_else(|| AppError::NotFound(format!("watermark for chain {}", chain_id)))?;

    Ok(Json(watermark.into()))
}

/// POST /api/v1/scan - run one reconciliation cycle now
pub async fn trigger_scan(State(state): State<AppState>) -> AppResult<Json<CycleReportResponse>> {
    info!("Manual reconciliation cycle requested");
    let report = dispatch_cycle(&state.scanner).await?;
    Ok(Json(report.into()))
}

/// POST /api/v1/entities
pub async fn register_entity(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterEntityRequest>,
) -> AppResult<(StatusCode, Json<EntityResponse>)> {
    let wallet_address = state.codec.normalize(&request.wallet_address)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name must not be blank".into()));
    }

    let entity = state.ledger.register_entity(name, &wallet_address).await?;
    let response = EntityResponse::from_entity(entity, &state.codec)?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/entities/:id
pub async fn get_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
) -> AppResult<Json<EntityResponse>> {
    let entity = state
        .ledger
        .get_entity(entity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("entity {}", entity_id)))?;

    Ok(Json(EntityResponse::from_entity(entity, &state.codec)?))
}

/// GET /api/v1/entities/:id/deposits - newest first
pub async fn list_entity_deposits(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<DepositListQuery>,
) -> AppResult<Json<DepositListResponse>> {
    if state.ledger.get_entity(entity_id).await?.is_none() {
        return Err(AppError::NotFound(format!("entity {}", entity_id)));
    }

    let deposits = state
        .ledger
        .list_entries_for_entity(entity_id, query.limit())
        .await?
        .into_iter()
        .map(DepositResponse::from)
        .collect();

    Ok(Json(DepositListResponse { entity_id, deposits }))
}
