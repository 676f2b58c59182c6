use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::enums::{ ProviderId, ProviderKind };
use crate::error::{ AppError, Result };
use crate::providers::explorers::{ BlockchairExplorer, NownodesExplorer, SochainExplorer };
use crate::providers::rates::{ BinanceRate, CoinGeckoRate, KrakenRate };
use crate::providers::ProviderProbe;

/// Lookup table from provider id to its probe, plus the order rate sources are
/// consulted in.
#[derive(Clone)]
pub struct ProviderRegistry {
    probes: BTreeMap<ProviderId, Arc<dyn ProviderProbe>>,
    rate_priority: Vec<ProviderId>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
            rate_priority: ProviderId::rate_priority().to_vec(),
        }
    }

    /// Registry with every production provider, sharing one HTTP client whose
    /// timeout bounds each probe.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client
            ::builder()
            .timeout(config.status.probe_timeout)
            .user_agent(concat!("payment-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let network = config.network_mode;
        let mut registry = Self::new();
        registry
            .register(
                Arc::new(
                    BlockchairExplorer::new(
                        client.clone(),
                        network,
                        config.blockchair_api_key.clone()
                    )
                )
            )
            .register(Arc::new(SochainExplorer::new(client.clone(), network)))
            .register(
                Arc::new(
                    NownodesExplorer::new(client.clone(), network, config.nownodes_api_key.clone())
                )
            )
            .register(Arc::new(CoinGeckoRate::new(client.clone())))
            .register(Arc::new(BinanceRate::new(client.clone())))
            .register(Arc::new(KrakenRate::new(client)));

        if config.nownodes_api_key.is_none() {
            tracing::warn!("NOWNODES_API_KEY is not set; Nownodes will report offline");
        }

        Ok(registry)
    }

    /// Add or replace the probe for its provider id.
    pub fn register(&mut self, probe: Arc<dyn ProviderProbe>) -> &mut Self {
        self.probes.insert(probe.id(), probe);
        self
    }

    pub fn with_rate_priority(mut self, priority: Vec<ProviderId>) -> Self {
        self.rate_priority = priority;
        self
    }

    pub fn get(&self, provider: ProviderId) -> Option<Arc<dyn ProviderProbe>> {
        self.probes.get(&provider).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn ProviderProbe>> {
        self.probes.values().cloned().collect()
    }

    pub fn explorers(&self) -> Vec<Arc<dyn ProviderProbe>> {
        self.probes
            .values()
            .filter(|p| p.id().kind() == ProviderKind::Explorer)
            .cloned()
            .collect()
    }

    /// Registered rate sources, most preferred first.
    pub fn rate_sources(&self) -> Vec<Arc<dyn ProviderProbe>> {
        self.rate_priority
            .iter()
            .filter_map(|id| self.probes.get(id).cloned())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusConfig;
    use crate::enums::NetworkMode;

    fn test_config() -> Config {
        Config {
            network_mode: NetworkMode::Mainnet,
            database_url: "sqlite::memory:".to_string(),
            wallet_mnemonic: String::new(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            blockchair_api_key: None,
            nownodes_api_key: Some("key".to_string()),
            canary_address: None,
            status: StatusConfig::default(),
        }
    }

    #[test]
    fn test_from_config_registers_every_provider() {
        let registry = ProviderRegistry::from_config(&test_config()).unwrap();

        for provider in ProviderId::all() {
            assert_eq!(registry.get(*provider).unwrap().id(), *provider);
        }

        let explorers: Vec<ProviderId> = registry.explorers().iter().map(|p| p.id()).collect();
        assert_eq!(explorers, ProviderId::explorers().to_vec());

        let rates: Vec<ProviderId> = registry.rate_sources().iter().map(|p| p.id()).collect();
        assert_eq!(rates, ProviderId::rate_priority().to_vec());
    }

    #[test]
    fn test_custom_rate_priority_skips_unregistered() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(KrakenRate::new(reqwest::Client::new())));
        let registry = registry.with_rate_priority(vec![ProviderId::Binance, ProviderId::Kraken]);

        let rates: Vec<ProviderId> = registry.rate_sources().iter().map(|p| p.id()).collect();
        assert_eq!(rates, vec![ProviderId::Kraken]);
    }
}
