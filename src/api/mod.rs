use std::sync::Arc;

use axum::{ routing::{ get, patch, post, put }, Router };

pub mod status;
pub mod providers;
pub mod addresses;
pub mod backup;

use crate::db::QuotaLedger;
use crate::services::{ AddressService, StatusService };

#[derive(Clone)]
pub struct AppState {
    pub status_service: Arc<StatusService>,
    pub address_service: Arc<AddressService>,
    pub ledger: QuotaLedger,
}

impl AppState {
    pub fn new(
        status_service: Arc<StatusService>,
        address_service: Arc<AddressService>,
        ledger: QuotaLedger
    ) -> Self {
        Self {
            status_service,
            address_service,
            ledger,
        }
    }
}

/// Admin API of the payment system, mounted under `/api/payment-system`.
pub fn router(state: AppState) -> Router {
    let payment_system = Router::new()
        .route("/status", get(status::get_status))
        .route("/status/refresh", post(status::refresh_status))
        .route("/providers", get(providers::list_providers))
        .route("/providers/reset-quota", post(providers::reset_quota))
        .route("/providers/{name}/test", post(providers::test_provider))
        .route("/providers/{name}/daily-limit", put(providers::update_daily_limit))
        .route("/providers/{name}/api-key", put(providers::update_api_key))
        .route(
            "/addresses",
            get(addresses::list_addresses).post(addresses::generate_address)
        )
        .route("/addresses/{address}", patch(addresses::update_label))
        .route("/addresses/{address}/balance", post(addresses::check_balance))
        .route("/backup", post(backup::export_backup))
        .route("/backup/restore", post(backup::verify_backup));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/payment-system", payment_system)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
