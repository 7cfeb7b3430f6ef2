//! Lookup Routes
//!
//! Plan and account lists feeding the capture form.
//!
//! Endpoints:
//! - GET /fetch_id_rencana - Normalized plan ids
//! - GET /fetch_account_skkos - Account codes
//! - GET /get_rencana_details?rencana_id= - One plan's details

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::ledger::{LedgerError, PlanDetails};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fetch_id_rencana", get(fetch_plan_ids))
        .route("/fetch_account_skkos", get(fetch_account_codes))
        .route("/get_rencana_details", get(get_plan_details))
}

async fn fetch_plan_ids(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let ids = state.ledger().plan_ids().await.map_err(|e| {
        tracing::error!("Error fetching plan ids: {}", e);
        AppError::Internal("Error fetching Id Rencana".to_string())
    })?;

    Ok(Json(ids))
}

async fn fetch_account_codes(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let codes = state.ledger().account_codes().await.map_err(|e| {
        tracing::error!("Error fetching account codes: {}", e);
        AppError::Internal("Error fetching Account SKKOs".to_string())
    })?;

    Ok(Json(codes))
}

#[derive(Debug, Deserialize)]
struct PlanQuery {
    rencana_id: Option<String>,
}

async fn get_plan_details(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<PlanDetails>> {
    let plan_id = query
        .rencana_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No rencana_id provided".to_string()))?;

    match state.ledger().find_plan(&plan_id).await {
        Ok(Some(details)) => Ok(Json(details)),
        Ok(None) => Err(AppError::NotFound("ID Rencana not found".to_string())),
        Err(e @ LedgerError::NoPlanRecords) => Err(AppError::NotFound(e.to_string())),
        Err(e) => {
            tracing::error!(plan_id = %plan_id, "Error fetching plan details: {}", e);
            Err(AppError::Internal("Error fetching Rencana details".to_string()))
        }
    }
}
