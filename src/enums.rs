use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── ProviderKind ────────────────────────────────────────────────────

/// What a provider is queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Blockchain explorer: balance and transaction count of an address.
    Explorer,
    /// Exchange: LTC/USD price.
    Rate,
}

// ─── ProviderId ──────────────────────────────────────────────────────

/// Every external service the payment system talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    Blockchair,
    Sochain,
    Nownodes,
    CoinGecko,
    Binance,
    Kraken,
}

impl ProviderId {
    /// Canonical name stored in `explorer_api_stats.provider_name`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Blockchair => "Blockchair",
            ProviderId::Sochain => "Sochain",
            ProviderId::Nownodes => "Nownodes",
            ProviderId::CoinGecko => "CoinGecko",
            ProviderId::Binance => "Binance",
            ProviderId::Kraken => "Kraken",
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderId::Blockchair | ProviderId::Sochain | ProviderId::Nownodes => {
                ProviderKind::Explorer
            }
            ProviderId::CoinGecko | ProviderId::Binance | ProviderId::Kraken => ProviderKind::Rate,
        }
    }

    /// Free-tier daily request allowance published by each provider.
    pub fn default_daily_limit(&self) -> i32 {
        match self {
            ProviderId::Blockchair => 1440,
            ProviderId::Sochain => 1000,
            ProviderId::Nownodes => 3300,
            ProviderId::CoinGecko => 10000,
            ProviderId::Binance => 100000,
            ProviderId::Kraken => 20000,
        }
    }

    /// All providers, explorers first.
    pub fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Blockchair,
            ProviderId::Sochain,
            ProviderId::Nownodes,
            ProviderId::CoinGecko,
            ProviderId::Binance,
            ProviderId::Kraken,
        ]
    }

    pub fn explorers() -> &'static [ProviderId] {
        &[ProviderId::Blockchair, ProviderId::Sochain, ProviderId::Nownodes]
    }

    /// Rate sources in the order they are consulted.
    pub fn rate_priority() -> &'static [ProviderId] {
        &[ProviderId::CoinGecko, ProviderId::Binance, ProviderId::Kraken]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blockchair" => Ok(ProviderId::Blockchair),
            "sochain" | "chain.so" => Ok(ProviderId::Sochain),
            "nownodes" => Ok(ProviderId::Nownodes),
            "coingecko" => Ok(ProviderId::CoinGecko),
            "binance" => Ok(ProviderId::Binance),
            "kraken" => Ok(ProviderId::Kraken),
            _ => Err(AppError::InvalidInput(format!("Unknown provider: {}", s))),
        }
    }
}

// ─── NetworkMode ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Mainnet,
    Testnet,
}

impl NetworkMode {
    /// Bech32 human-readable part of native SegWit addresses.
    pub fn bech32_hrp(&self) -> &'static str {
        match self {
            NetworkMode::Mainnet => "ltc",
            NetworkMode::Testnet => "tltc",
        }
    }

    /// SLIP-44 coin type used in the BIP84 derivation path.
    pub fn coin_type(&self) -> u32 {
        match self {
            NetworkMode::Mainnet => 2,
            NetworkMode::Testnet => 1,
        }
    }
}

impl FromStr for NetworkMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(NetworkMode::Mainnet),
            "testnet" => Ok(NetworkMode::Testnet),
            _ => Err(AppError::Config("NETWORK_MODE must be 'testnet' or 'mainnet'".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_roundtrip() {
        for provider in ProviderId::all() {
            assert_eq!(provider.as_str().parse::<ProviderId>().unwrap(), *provider);
        }
        assert_eq!("COINGECKO".parse::<ProviderId>().unwrap(), ProviderId::CoinGecko);
        assert!("etherscan".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_groups_are_disjoint() {
        for explorer in ProviderId::explorers() {
            assert_eq!(explorer.kind(), ProviderKind::Explorer);
        }
        for rate in ProviderId::rate_priority() {
            assert_eq!(rate.kind(), ProviderKind::Rate);
        }
        assert_eq!(
            ProviderId::explorers().len() + ProviderId::rate_priority().len(),
            ProviderId::all().len()
        );
    }
}
