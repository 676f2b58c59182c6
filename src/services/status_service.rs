use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use chrono::{ DateTime, Utc };
use sea_orm::prelude::Decimal;
use serde::Serialize;
use tokio::sync::{ Mutex, MutexGuard, Notify, RwLock };
use tokio::task::JoinSet;

use crate::config::StatusConfig;
use crate::db::QuotaLedger;
use crate::enums::{ ProviderId, ProviderKind };
use crate::error::{ AppError, ProbeError, ProbeResult, Result };
use crate::providers::{ AddressBalance, ProviderProbe, ProviderRegistry };
use crate::wallet::WalletBackend;

const QUOTA_EXHAUSTED: &str = "daily quota exhausted";

/// Request counters copied from the quota ledger at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCounters {
    pub total_requests: i32,
    pub successful_requests: i32,
    pub remaining_daily_requests: i32,
    pub daily_limit: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub kind: ProviderKind,
    pub online: bool,
    pub response_time_ms: Option<u64>,
    pub last_checked: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub counters: Option<ProviderCounters>,
}

/// Everything the dashboard shows about the payment system, captured at one
/// point in time. Never mutated after publication.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatusSnapshot {
    /// `None` until the first refresh completes.
    pub last_update: Option<DateTime<Utc>>,
    pub wallet_healthy: bool,
    pub wallet_message: String,
    /// LTC/USD, zero when no rate source answered.
    pub current_rate: Decimal,
    pub rate_source: Option<ProviderId>,
    pub api_services: BTreeMap<String, ProviderStatus>,
    #[serde(skip)]
    refreshed_at: Option<Instant>,
}

impl SystemStatusSnapshot {
    pub fn empty() -> Self {
        Self {
            last_update: None,
            wallet_healthy: false,
            wallet_message: "Status not collected yet".to_string(),
            current_rate: Decimal::ZERO,
            rate_source: None,
            api_services: BTreeMap::new(),
            refreshed_at: None,
        }
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => at.elapsed() > max_age,
            None => true,
        }
    }

    pub fn online_count(&self) -> usize {
        self.api_services
            .values()
            .filter(|s| s.online)
            .count()
    }
}

/// Result of probing a single provider on operator request.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderTestReport {
    pub provider: ProviderId,
    pub success: bool,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<AddressBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owns the published status snapshot and the logic that rebuilds it.
pub struct StatusService {
    registry: ProviderRegistry,
    ledger: QuotaLedger,
    wallet: Arc<dyn WalletBackend>,
    canary_address: String,
    staleness: Duration,
    daily_quota_reset: bool,
    snapshot: RwLock<Arc<SystemStatusSnapshot>>,
    refresh_guard: Mutex<()>,
    refresh_requested: Notify,
}

impl StatusService {
    pub fn new(
        registry: ProviderRegistry,
        ledger: QuotaLedger,
        wallet: Arc<dyn WalletBackend>,
        canary_address: String,
        config: &StatusConfig
    ) -> Self {
        Self {
            registry,
            ledger,
            wallet,
            canary_address,
            staleness: config.staleness,
            daily_quota_reset: config.daily_quota_reset,
            snapshot: RwLock::new(Arc::new(SystemStatusSnapshot::empty())),
            refresh_guard: Mutex::new(()),
            refresh_requested: Notify::new(),
        }
    }

    /// Currently published snapshot, without triggering any work.
    pub async fn snapshot(&self) -> Arc<SystemStatusSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Cached snapshot, refreshed first when it is stale and nobody else is
    /// already refreshing it.
    pub async fn read_snapshot(&self) -> Arc<SystemStatusSnapshot> {
        let current = self.snapshot().await;
        if !current.is_stale(self.staleness) {
            return current;
        }

        match self.refresh_guard.try_lock() {
            Ok(guard) => {
                tracing::debug!("Status snapshot is stale, refreshing before read");
                self.refresh_locked(guard).await;
                self.snapshot().await
            }
            Err(_) => current,
        }
    }

    /// Run one full aggregation cycle, waiting for any in-flight one first.
    /// Returns whether a new snapshot was published.
    pub async fn refresh_now(&self) -> bool {
        let guard = self.refresh_guard.lock().await;
        self.refresh_locked(guard).await
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_guard.try_lock().is_err()
    }

    /// Ask the background loop for an early refresh.
    pub fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }

    pub(crate) async fn refresh_requested(&self) {
        self.refresh_requested.notified().await
    }

    pub async fn record_provider_attempt(&self, provider: ProviderId, succeeded: bool) {
        self.ledger.record_provider_attempt(provider, succeeded).await
    }

    /// Swap the API key of a running provider. The key lives in memory only
    /// and is replaced by the configured one on restart.
    pub async fn set_api_key(&self, provider: ProviderId, api_key: Option<String>) -> Result<()> {
        let probe = self.registry
            .get(provider)
            .ok_or_else(|| AppError::NotFound(format!("Provider {} is not configured", provider)))?;

        let api_key = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        let cleared = api_key.is_none();

        probe.set_api_key(api_key).await.map_err(|e| {
            match e {
                ProbeError::Unsupported =>
                    AppError::InvalidInput(format!("Provider {} does not use an API key", provider)),
                other => AppError::Provider(other),
            }
        })?;

        if cleared {
            tracing::info!("API key for {} cleared", provider);
        } else {
            tracing::info!("API key for {} replaced", provider);
        }
        Ok(())
    }

    async fn refresh_locked(&self, _guard: MutexGuard<'_, ()>) -> bool {
        let started = Instant::now();
        match self.collect().await {
            Ok(snapshot) => {
                tracing::info!(
                    "Status refreshed in {:?}: wallet_healthy={}, rate={}, {}/{} providers online",
                    started.elapsed(),
                    snapshot.wallet_healthy,
                    snapshot.current_rate,
                    snapshot.online_count(),
                    snapshot.api_services.len()
                );
                *self.snapshot.write().await = Arc::new(snapshot);
                true
            }
            Err(e) => {
                tracing::error!("Status refresh failed, keeping previous snapshot: {}", e);
                false
            }
        }
    }

    /// Build a complete snapshot. Provider failures degrade individual entries;
    /// only an unreachable ledger fails the whole cycle.
    async fn collect(&self) -> Result<SystemStatusSnapshot> {
        if self.daily_quota_reset {
            self.ledger.roll_over(Utc::now().date_naive()).await?;
        }

        let wallet = self.wallet.health_check();
        if !wallet.healthy {
            tracing::warn!("Wallet health check failed: {}", wallet.message);
        }

        let rate = self.discover_rate().await;
        let mut api_services = self.check_services().await;

        for row in self.ledger.all_stats().await? {
            if let Some(status) = api_services.get_mut(&row.provider_name) {
                status.counters = Some(ProviderCounters {
                    total_requests: row.total_requests,
                    successful_requests: row.successful_requests,
                    remaining_daily_requests: row.remaining_daily_requests,
                    daily_limit: row.daily_limit,
                });
            }
        }

        let explorer_online = api_services
            .values()
            .any(|s| s.kind == ProviderKind::Explorer && s.online);

        let wallet_message = if wallet.healthy && !explorer_online {
            "Wallet ready but no blockchain explorer is reachable".to_string()
        } else {
            wallet.message
        };

        Ok(SystemStatusSnapshot {
            last_update: Some(Utc::now()),
            wallet_healthy: wallet.healthy && explorer_online,
            wallet_message,
            current_rate: rate.map(|(_, r)| r).unwrap_or(Decimal::ZERO),
            rate_source: rate.map(|(p, _)| p),
            api_services,
            refreshed_at: Some(Instant::now()),
        })
    }

    /// Walk the rate sources in priority order and adopt the first positive
    /// price. Sources without quota are skipped without being called.
    pub async fn discover_rate(&self) -> Option<(ProviderId, Decimal)> {
        for probe in self.registry.rate_sources() {
            let provider = probe.id();

            if !self.ledger.has_quota(provider).await {
                tracing::info!("Skipping {} for rate lookup: daily quota exhausted", provider);
                continue;
            }

            match probe.probe_rate().await {
                Ok(rate) if rate > Decimal::ZERO => {
                    self.ledger.record_provider_attempt(provider, true).await;
                    tracing::debug!("LTC/USD rate {} from {}", rate, provider);
                    return Some((provider, rate));
                }
                Ok(rate) => {
                    tracing::warn!("{} returned non-positive rate {}", provider, rate);
                    self.ledger.record_provider_attempt(provider, false).await;
                }
                Err(e) => {
                    tracing::warn!("Rate lookup via {} failed: {}", provider, e);
                    self.ledger.record_failure(provider, &e).await;
                }
            }
        }

        tracing::warn!("No rate source returned a usable LTC/USD rate");
        None
    }

    /// Probe every registered provider with quota left concurrently and wait
    /// for all of them. Exhausted providers are reported offline without a call.
    async fn check_services(&self) -> BTreeMap<String, ProviderStatus> {
        let mut services: BTreeMap<String, ProviderStatus> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for probe in self.registry.all() {
            let provider = probe.id();

            if !self.ledger.has_quota(provider).await {
                tracing::info!("Skipping {} online check: daily quota exhausted", provider);
                services.insert(provider.as_str().to_string(), ProviderStatus {
                    kind: provider.kind(),
                    online: false,
                    response_time_ms: None,
                    last_checked: Utc::now(),
                    error: Some(QUOTA_EXHAUSTED.to_string()),
                    counters: None,
                });
                continue;
            }

            // Placeholder kept if the task dies before reporting.
            services.insert(provider.as_str().to_string(), ProviderStatus {
                kind: provider.kind(),
                online: false,
                response_time_ms: None,
                last_checked: Utc::now(),
                error: Some("check did not complete".to_string()),
                counters: None,
            });

            let ledger = self.ledger.clone();
            let canary = self.canary_address.clone();
            tasks.spawn(async move {
                let (outcome, elapsed) = timed_check(probe.as_ref(), &canary).await;
                match &outcome {
                    Ok(()) => ledger.record_provider_attempt(provider, true).await,
                    Err(e) => ledger.record_failure(provider, e).await,
                }
                (provider, outcome, elapsed)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((provider, outcome, elapsed)) => {
                    match &outcome {
                        Err(e) if e.is_no_data() => tracing::debug!("{} is offline: {}", provider, e),
                        Err(e) => tracing::warn!("{} cannot be checked: {}", provider, e),
                        Ok(()) => {}
                    }
                    services.insert(provider.as_str().to_string(), ProviderStatus {
                        kind: provider.kind(),
                        online: outcome.is_ok(),
                        response_time_ms: Some(elapsed),
                        last_checked: Utc::now(),
                        error: outcome.err().map(|e| e.to_string()),
                        counters: None,
                    });
                }
                Err(e) => tracing::error!("Provider check task failed: {}", e),
            }
        }

        services
    }

    /// Probe one provider now and record the attempt. Explorers are probed
    /// with `address` when given, otherwise with the canary address.
    pub async fn test_provider(
        &self,
        provider: ProviderId,
        address: Option<&str>
    ) -> Result<ProviderTestReport> {
        let probe = self.registry
            .get(provider)
            .ok_or_else(|| AppError::NotFound(format!("Provider {} is not configured", provider)))?;

        let started = Instant::now();
        let (balance, rate) = match provider.kind() {
            ProviderKind::Explorer => {
                let target = address.unwrap_or(&self.canary_address);
                (Some(probe.probe_balance(target).await), None)
            }
            ProviderKind::Rate => (None, Some(probe.probe_rate().await)),
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        let failure = match (&balance, &rate) {
            (Some(Err(e)), _) | (_, Some(Err(e))) => Some(e.clone()),
            _ => None,
        };
        match &failure {
            None => self.ledger.record_provider_attempt(provider, true).await,
            Some(e) => self.ledger.record_failure(provider, e).await,
        }
        let success = failure.is_none();
        let error = failure.map(|e| e.to_string());

        Ok(ProviderTestReport {
            provider,
            success,
            response_time_ms,
            balance: balance.and_then(|b| b.ok()),
            rate: rate.and_then(|r| r.ok()),
            error,
        })
    }
}

/// One liveness probe: a balance lookup for explorers, a price lookup for rate
/// sources. Returns the outcome and the elapsed milliseconds.
async fn timed_check(probe: &dyn ProviderProbe, canary: &str) -> (ProbeResult<()>, u64) {
    let started = Instant::now();
    let outcome = match probe.id().kind() {
        ProviderKind::Explorer => probe.probe_balance(canary).await.map(|_| ()),
        ProviderKind::Rate =>
            probe.probe_rate().await.and_then(|rate| {
                if rate > Decimal::ZERO {
                    Ok(())
                } else {
                    Err(ProbeError::Malformed(format!("non-positive rate {}", rate)))
                }
            }),
    };
    (outcome, started.elapsed().as_millis() as u64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::enums::NetworkMode;
    use crate::wallet::{ BackupCheck, DerivedAddress, WalletHealth };
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use tokio::sync::Semaphore;

    /// Scripted provider that counts its calls.
    pub(crate) struct FakeProbe {
        id: ProviderId,
        balance: ProbeResult<AddressBalance>,
        rate: ProbeResult<Decimal>,
        gate: Option<Arc<Semaphore>>,
        pub calls: AtomicUsize,
    }

    impl FakeProbe {
        pub(crate) fn rate(id: ProviderId, rate: &str) -> Arc<Self> {
            Arc::new(Self {
                id,
                balance: Err(ProbeError::Unsupported),
                rate: Ok(Decimal::from_str(rate).unwrap()),
                gate: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn explorer(id: ProviderId, balance: &str, txs: Option<u64>) -> Arc<Self> {
            Arc::new(Self {
                id,
                balance: Ok(AddressBalance {
                    balance: Decimal::from_str(balance).unwrap(),
                    transaction_count: txs,
                }),
                rate: Err(ProbeError::Unsupported),
                gate: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(id: ProviderId, error: ProbeError) -> Arc<Self> {
            Arc::new(Self {
                id,
                balance: Err(error.clone()),
                rate: Err(error),
                gate: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn gated(id: ProviderId, rate: &str, gate: Arc<Semaphore>) -> Arc<Self> {
            Arc::new(Self {
                id,
                balance: Err(ProbeError::Unsupported),
                rate: Ok(Decimal::from_str(rate).unwrap()),
                gate: Some(gate),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }
    }

    #[async_trait]
    impl ProviderProbe for FakeProbe {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn probe_balance(&self, _address: &str) -> ProbeResult<AddressBalance> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            self.balance.clone()
        }

        async fn probe_rate(&self) -> ProbeResult<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            self.rate.clone()
        }
    }

    pub(crate) struct FakeWallet {
        pub healthy: bool,
    }

    impl WalletBackend for FakeWallet {
        fn health_check(&self) -> WalletHealth {
            WalletHealth {
                healthy: self.healthy,
                network: NetworkMode::Mainnet,
                message: if self.healthy { "ok".into() } else { "wallet file missing".into() },
            }
        }

        fn derive_address(&self, index: u32) -> Result<DerivedAddress> {
            Ok(DerivedAddress { address: format!("ltc1qfake{}", index), index })
        }

        fn export_backup(&self, password: &str) -> Result<Vec<u8>> {
            Ok(format!("backup:{}", password).into_bytes())
        }

        fn verify_backup(&self, sealed: &[u8], password: &str) -> Result<BackupCheck> {
            let stored = sealed
                .strip_prefix(b"backup:")
                .ok_or_else(|| AppError::Encryption("Not a wallet backup file".into()))?;
            if stored != password.as_bytes() {
                return Err(AppError::Encryption("Wrong password or corrupted backup".into()));
            }
            Ok(BackupCheck { first_address: "ltc1qfake0".into(), matches_wallet: true })
        }
    }

    pub(crate) async fn seeded_ledger(limit: i32) -> QuotaLedger {
        let ledger = QuotaLedger::new(test_connection().await);
        for provider in ProviderId::all() {
            ledger.seed_provider(*provider, limit).await.unwrap();
        }
        ledger
    }

    pub(crate) fn service(
        probes: Vec<Arc<dyn ProviderProbe>>,
        ledger: QuotaLedger,
        healthy_wallet: bool
    ) -> StatusService {
        let mut registry = ProviderRegistry::new();
        for probe in probes {
            registry.register(probe);
        }
        StatusService::new(
            registry,
            ledger,
            Arc::new(FakeWallet { healthy: healthy_wallet }),
            "ltc1qcanary".to_string(),
            &StatusConfig::default()
        )
    }

    #[tokio::test]
    async fn test_rate_fallback_stops_at_first_positive() {
        let ledger = seeded_ledger(100).await;
        let a = FakeProbe::rate(ProviderId::CoinGecko, "0");
        let b = FakeProbe::rate(ProviderId::Binance, "89.5");
        let c = FakeProbe::rate(ProviderId::Kraken, "91");
        let status = service(vec![a.clone(), b.clone(), c.clone()], ledger.clone(), true);

        let (provider, rate) = status.discover_rate().await.unwrap();
        assert_eq!(provider, ProviderId::Binance);
        assert_eq!(rate, Decimal::from_str("89.5").unwrap());
        assert_eq!(c.calls(), 0);

        let a_row = ledger.find(ProviderId::CoinGecko).await.unwrap().unwrap();
        assert_eq!((a_row.total_requests, a_row.successful_requests), (1, 0));
        let b_row = ledger.find(ProviderId::Binance).await.unwrap().unwrap();
        assert_eq!((b_row.total_requests, b_row.successful_requests), (1, 1));
        let c_row = ledger.find(ProviderId::Kraken).await.unwrap().unwrap();
        assert_eq!(c_row.total_requests, 0);
    }

    #[tokio::test]
    async fn test_rate_lookup_skips_exhausted_provider() {
        let ledger = QuotaLedger::new(test_connection().await);
        ledger.seed_provider(ProviderId::CoinGecko, 0).await.unwrap();
        ledger.seed_provider(ProviderId::Binance, 10).await.unwrap();
        ledger.seed_provider(ProviderId::Kraken, 10).await.unwrap();

        let a = FakeProbe::rate(ProviderId::CoinGecko, "88");
        let b = FakeProbe::rate(ProviderId::Binance, "89.5");
        let status = service(vec![a.clone(), b.clone()], ledger.clone(), true);

        let (provider, _) = status.discover_rate().await.unwrap();
        assert_eq!(provider, ProviderId::Binance);
        assert_eq!(a.calls(), 0);

        let a_row = ledger.find(ProviderId::CoinGecko).await.unwrap().unwrap();
        assert_eq!(a_row.total_requests, 0);
    }

    #[tokio::test]
    async fn test_rate_lookup_errors_fall_through() {
        let ledger = seeded_ledger(10).await;
        let status = service(
            vec![
                FakeProbe::failing(ProviderId::CoinGecko, ProbeError::Timeout),
                FakeProbe::failing(ProviderId::Binance, ProbeError::Http(451)),
                FakeProbe::rate(ProviderId::Kraken, "90.1")
            ],
            ledger,
            true
        );

        let (provider, rate) = status.discover_rate().await.unwrap();
        assert_eq!(provider, ProviderId::Kraken);
        assert_eq!(rate, Decimal::from_str("90.1").unwrap());
    }

    #[tokio::test]
    async fn test_refresh_publishes_full_snapshot() {
        let ledger = seeded_ledger(100).await;
        let status = service(
            vec![
                FakeProbe::explorer(ProviderId::Blockchair, "1.5", Some(3)),
                FakeProbe::failing(ProviderId::Sochain, ProbeError::Timeout),
                FakeProbe::rate(ProviderId::CoinGecko, "89.5")
            ],
            ledger,
            true
        );

        assert!(status.snapshot().await.last_update.is_none());
        assert!(status.refresh_now().await);

        let snapshot = status.snapshot().await;
        assert!(snapshot.last_update.is_some());
        assert!(snapshot.wallet_healthy);
        assert_eq!(snapshot.current_rate, Decimal::from_str("89.5").unwrap());
        assert_eq!(snapshot.rate_source, Some(ProviderId::CoinGecko));
        assert_eq!(snapshot.api_services.len(), 3);
        assert!(snapshot.api_services["Blockchair"].online);
        assert!(!snapshot.api_services["Sochain"].online);
        assert_eq!(
            snapshot.api_services["Sochain"].error.as_deref(),
            Some("request timed out")
        );

        // Rate discovery and the online check each count once.
        let coingecko = snapshot.api_services["CoinGecko"].counters.as_ref().unwrap();
        assert_eq!(coingecko.total_requests, 2);
        assert_eq!(coingecko.successful_requests, 2);
        assert_eq!(coingecko.remaining_daily_requests, 98);
    }

    #[tokio::test]
    async fn test_all_providers_failing_still_publishes() {
        let ledger = seeded_ledger(100).await;
        let status = service(
            ProviderId::all()
                .iter()
                .map(|id| FakeProbe::failing(*id, ProbeError::Transport("dns".into())) as Arc<dyn ProviderProbe>)
                .collect(),
            ledger,
            true
        );

        assert!(status.refresh_now().await);

        let snapshot = status.snapshot().await;
        assert!(!snapshot.wallet_healthy);
        assert_eq!(snapshot.online_count(), 0);
        assert_eq!(snapshot.api_services.len(), ProviderId::all().len());
        assert_eq!(snapshot.current_rate, Decimal::ZERO);
        assert!(snapshot.rate_source.is_none());
    }

    #[tokio::test]
    async fn test_unhealthy_wallet_reported() {
        let ledger = seeded_ledger(100).await;
        let status = service(
            vec![FakeProbe::explorer(ProviderId::Blockchair, "0", Some(0))],
            ledger,
            false
        );

        assert!(status.refresh_now().await);
        let snapshot = status.snapshot().await;
        assert!(!snapshot.wallet_healthy);
        assert_eq!(snapshot.wallet_message, "wallet file missing");
    }

    #[tokio::test]
    async fn test_readers_never_see_partial_snapshot() {
        let ledger = seeded_ledger(100).await;
        let gate = Arc::new(Semaphore::new(0));
        let status = Arc::new(
            service(
                vec![
                    FakeProbe::gated(ProviderId::CoinGecko, "89.5", gate.clone()),
                    FakeProbe::explorer(ProviderId::Blockchair, "1", Some(1))
                ],
                ledger,
                true
            )
        );

        let refresher = {
            let status = status.clone();
            tokio::spawn(async move { status.refresh_now().await })
        };

        // Let the refresh reach the gated probe.
        while !status.is_refreshing() {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let during = status.snapshot().await;
        assert!(during.last_update.is_none());
        assert_eq!(during.current_rate, Decimal::ZERO);
        assert!(during.api_services.is_empty());

        // Stale and already refreshing: read-through must not wait.
        let through = status.read_snapshot().await;
        assert!(through.last_update.is_none());

        gate.add_permits(10);
        assert!(refresher.await.unwrap());

        let after = status.snapshot().await;
        assert_eq!(after.current_rate, Decimal::from_str("89.5").unwrap());
        assert_eq!(after.api_services.len(), 2);
    }

    #[tokio::test]
    async fn test_read_through_serves_fresh_cache() {
        let ledger = seeded_ledger(100).await;
        let probe = FakeProbe::rate(ProviderId::Binance, "80");
        let status = service(vec![probe.clone()], ledger, true);

        let first = status.read_snapshot().await;
        assert!(first.last_update.is_some());
        let calls = probe.calls();

        let second = status.read_snapshot().await;
        assert_eq!(first.last_update, second.last_update);
        assert_eq!(probe.calls(), calls);
    }

    #[tokio::test]
    async fn test_provider_test_report() {
        let ledger = seeded_ledger(100).await;
        let status = service(
            vec![
                FakeProbe::explorer(ProviderId::Nownodes, "0.25", Some(2)),
                FakeProbe::failing(ProviderId::Kraken, ProbeError::Http(503))
            ],
            ledger.clone(),
            true
        );

        let report = status.test_provider(ProviderId::Nownodes, None).await.unwrap();
        assert!(report.success);
        assert_eq!(report.balance.unwrap().transaction_count, Some(2));

        let report = status.test_provider(ProviderId::Kraken, None).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("HTTP status 503"));

        let row = ledger.find(ProviderId::Kraken).await.unwrap().unwrap();
        assert_eq!((row.total_requests, row.successful_requests), (1, 0));

        assert!(status.test_provider(ProviderId::Sochain, None).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_does_not_spend_quota() {
        let ledger = seeded_ledger(10).await;
        let nownodes = FakeProbe::failing(ProviderId::Nownodes, ProbeError::MissingApiKey);
        let status = service(vec![nownodes.clone()], ledger.clone(), true);

        for _ in 0..3 {
            assert!(status.refresh_now().await);
        }
        assert_eq!(nownodes.calls(), 3);

        let row = ledger.find(ProviderId::Nownodes).await.unwrap().unwrap();
        assert_eq!(row.total_requests, 0);
        assert_eq!(row.remaining_daily_requests, 10);

        let snapshot = status.snapshot().await;
        let entry = &snapshot.api_services["Nownodes"];
        assert!(!entry.online);
        assert_eq!(entry.error.as_deref(), Some("API key is not configured"));
        assert_eq!(entry.counters.as_ref().unwrap().remaining_daily_requests, 10);
    }

    #[tokio::test]
    async fn test_online_check_skips_exhausted_provider() {
        let ledger = QuotaLedger::new(test_connection().await);
        ledger.seed_provider(ProviderId::Blockchair, 0).await.unwrap();
        ledger.seed_provider(ProviderId::Sochain, 10).await.unwrap();

        let blockchair = FakeProbe::explorer(ProviderId::Blockchair, "1", Some(1));
        let sochain = FakeProbe::explorer(ProviderId::Sochain, "1", Some(1));
        let status = service(vec![blockchair.clone(), sochain.clone()], ledger.clone(), true);

        assert!(status.refresh_now().await);
        assert_eq!(blockchair.calls(), 0);
        assert_eq!(sochain.calls(), 1);

        let snapshot = status.snapshot().await;
        let exhausted = &snapshot.api_services["Blockchair"];
        assert!(!exhausted.online);
        assert!(exhausted.response_time_ms.is_none());
        assert_eq!(exhausted.error.as_deref(), Some("daily quota exhausted"));
        assert_eq!(exhausted.counters.as_ref().unwrap().total_requests, 0);
        assert!(snapshot.api_services["Sochain"].online);
        assert!(snapshot.wallet_healthy);
    }

    #[tokio::test]
    async fn test_api_key_swap_reaches_provider() {
        use crate::providers::explorers::NownodesExplorer;

        let ledger = seeded_ledger(10).await;
        let nownodes = Arc::new(
            NownodesExplorer::with_base_url(reqwest::Client::new(), "http://127.0.0.1:9", None)
        );
        let status = service(
            vec![
                nownodes.clone() as Arc<dyn ProviderProbe>,
                FakeProbe::rate(ProviderId::CoinGecko, "80")
            ],
            ledger,
            true
        );

        status.set_api_key(ProviderId::Nownodes, Some(" key-1 ".into())).await.unwrap();
        let err = nownodes.probe_balance("ltc1qtest").await.unwrap_err();
        assert_ne!(err, ProbeError::MissingApiKey);

        // Blank clears the key.
        status.set_api_key(ProviderId::Nownodes, Some("  ".into())).await.unwrap();
        let err = nownodes.probe_balance("ltc1qtest").await.unwrap_err();
        assert_eq!(err, ProbeError::MissingApiKey);

        let err = status.set_api_key(ProviderId::CoinGecko, Some("k".into())).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = status.set_api_key(ProviderId::Blockchair, Some("k".into())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
