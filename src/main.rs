use payment_admin::{ AppError, Config, Result };
use migration::MigratorTrait;
use payment_admin::wallet::WalletBackend;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{ cors::CorsLayer, trace::TraceLayer };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "payment_admin=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!("Starting payment-admin with network mode: {:?}", config.network_mode);

    // Initialize database connection
    let db = sea_orm::Database::connect(&config.database_url).await?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await?;

    tracing::info!("Migrations completed successfully");

    let ledger = payment_admin::db::QuotaLedger::new(db.clone());
    ledger.seed_defaults().await?;

    // Wallet and providers
    let wallet = Arc::new(
        payment_admin::wallet::HdWallet::from_mnemonic(&config.wallet_mnemonic, config.network_mode)?
    );
    let canary_address = match &config.canary_address {
        Some(address) => address.clone(),
        None => wallet.derive_address(0)?.address,
    };
    tracing::info!("Explorers are probed with {}", canary_address);

    let registry = payment_admin::providers::ProviderRegistry::from_config(&config)?;

    // Initialize services
    let status_service = Arc::new(
        payment_admin::services::StatusService::new(
            registry.clone(),
            ledger.clone(),
            wallet.clone(),
            canary_address,
            &config.status
        )
    );

    let address_service = Arc::new(
        payment_admin::services::AddressService::new(
            payment_admin::db::AddressRepository::new(db),
            wallet,
            registry,
            ledger.clone()
        )
    );

    // Background refresh loop
    let shutdown = CancellationToken::new();
    let scheduler = payment_admin::scheduler::Scheduler::new(
        status_service.clone(),
        &config.status,
        shutdown.clone()
    );
    let scheduler_handle = tokio::spawn(scheduler.start());

    // Create app state
    let app_state = payment_admin::api::AppState::new(status_service, address_service, ledger);

    // Build application router
    let app = payment_admin::api
        ::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone())).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    shutdown.cancel();
    if let Err(e) = scheduler_handle.await {
        tracing::error!("Status scheduler task failed: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        }
        _ = shutdown.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
