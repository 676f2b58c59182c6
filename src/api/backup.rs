use axum::{ extract::State, http::header, response::IntoResponse, Json };
use serde::Deserialize;

use crate::error::{ AppError, Result };
use crate::wallet::BackupCheck;

use super::AppState;

#[derive(Deserialize)]
pub struct BackupRequest {
    pub password: String,
    pub password_confirm: String,
}

pub async fn export_backup(
    State(state): State<AppState>,
    Json(request): Json<BackupRequest>
) -> Result<impl IntoResponse> {
    let backup = state.address_service.export_backup(
        request.password,
        request.password_confirm
    ).await?;

    let filename = format!("wallet_backup_{}.enc", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];

    Ok((headers, backup))
}

#[derive(Deserialize)]
pub struct RestoreCheckRequest {
    /// Contents of a downloaded backup file, hex encoded.
    pub backup: String,
    pub password: String,
}

pub async fn verify_backup(
    State(state): State<AppState>,
    Json(request): Json<RestoreCheckRequest>
) -> Result<Json<BackupCheck>> {
    let sealed = hex
        ::decode(request.backup.trim())
        .map_err(|e| AppError::InvalidInput(format!("Backup is not valid hex: {}", e)))?;

    let check = state.address_service.verify_backup(sealed, request.password).await?;

    Ok(Json(check))
}
