use axum::{ extract::{ Path, Query, State }, http::StatusCode, Json };
use serde::Deserialize;

use crate::db::generated_address;
use crate::error::Result;
use crate::services::BalanceCheck;

use super::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u64>,
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>
) -> Result<Json<Vec<generated_address::Model>>> {
    let addresses = state.address_service.list(query.limit).await?;

    Ok(Json(addresses))
}

#[derive(Deserialize, Default)]
pub struct GenerateAddressRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub derivation_index: Option<u32>,
}

pub async fn generate_address(
    State(state): State<AppState>,
    request: Option<Json<GenerateAddressRequest>>
) -> Result<(StatusCode, Json<generated_address::Model>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let address = state.address_service.generate(request.derivation_index, request.label).await?;

    Ok((StatusCode::CREATED, Json(address)))
}

#[derive(Deserialize)]
pub struct UpdateLabelRequest {
    pub label: Option<String>,
}

pub async fn update_label(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<UpdateLabelRequest>
) -> Result<Json<generated_address::Model>> {
    let updated = state.address_service.update_label(&address, request.label).await?;

    Ok(Json(updated))
}

pub async fn check_balance(
    State(state): State<AppState>,
    Path(address): Path<String>
) -> Result<Json<BalanceCheck>> {
    let check = state.address_service.check_balance(&address).await?;

    Ok(Json(check))
}
