use axum::{ extract::{ Path, State }, Json };
use serde::{ Deserialize, Serialize };

use crate::db::provider_stats;
use crate::enums::ProviderId;
use crate::error::Result;
use crate::services::status_service::ProviderTestReport;

use super::AppState;

pub async fn list_providers(State(state): State<AppState>) -> Result<Json<Vec<provider_stats::Model>>> {
    let rows = state.ledger.all_stats().await?;

    Ok(Json(rows))
}

#[derive(Deserialize, Default)]
pub struct TestProviderRequest {
    /// Explorers only; the canary address is used when omitted.
    #[serde(default)]
    pub address: Option<String>,
}

pub async fn test_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Option<Json<TestProviderRequest>>
) -> Result<Json<ProviderTestReport>> {
    let provider: ProviderId = name.parse()?;
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let report = state.status_service.test_provider(provider, request.address.as_deref()).await?;

    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct DailyLimitRequest {
    pub daily_limit: i32,
}

pub async fn update_daily_limit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<DailyLimitRequest>
) -> Result<Json<provider_stats::Model>> {
    let provider: ProviderId = name.parse()?;
    let row = state.ledger.set_daily_limit(provider, request.daily_limit).await?;

    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct ApiKeyRequest {
    /// `null` or blank clears the key.
    pub api_key: Option<String>,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub provider: ProviderId,
    pub configured: bool,
}

pub async fn update_api_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ApiKeyRequest>
) -> Result<Json<ApiKeyResponse>> {
    let provider: ProviderId = name.parse()?;
    let configured = request.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());

    state.status_service.set_api_key(provider, request.api_key).await?;

    Ok(Json(ApiKeyResponse { provider, configured }))
}

#[derive(Deserialize, Default)]
pub struct ResetQuotaRequest {
    /// Every provider when omitted.
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct ResetQuotaResponse {
    pub reset: u64,
}

pub async fn reset_quota(
    State(state): State<AppState>,
    request: Option<Json<ResetQuotaRequest>>
) -> Result<Json<ResetQuotaResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let provider = request.provider
        .map(|name| name.parse::<ProviderId>())
        .transpose()?;

    let reset = state.ledger.reset_quota(provider).await?;

    Ok(Json(ResetQuotaResponse { reset }))
}
