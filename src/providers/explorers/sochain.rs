use async_trait::async_trait;
use serde::Deserialize;

use crate::enums::{ NetworkMode, ProviderId };
use crate::error::{ ProbeError, ProbeResult };
use crate::providers::probe::{ decode, fetch_body, parse_decimal };
use crate::providers::{ AddressBalance, ProviderProbe };

const SOCHAIN_API_BASE: &str = "https://sochain.com/api/v2";

/// SoChain balance lookup. Amounts are whole-coin decimal strings and no
/// transaction count is returned.
pub struct SochainExplorer {
    client: reqwest::Client,
    base_url: String,
    network_code: &'static str,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    status: String,
    data: Option<BalanceData>,
}

#[derive(Debug, Deserialize)]
struct BalanceData {
    confirmed_balance: String,
    unconfirmed_balance: String,
}

impl SochainExplorer {
    pub fn new(client: reqwest::Client, network: NetworkMode) -> Self {
        Self::with_base_url(client, SOCHAIN_API_BASE, network)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, network: NetworkMode) -> Self {
        let network_code = match network {
            NetworkMode::Mainnet => "LTC",
            NetworkMode::Testnet => "LTCTEST",
        };
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            network_code,
        }
    }

    fn parse_balance(body: &str) -> ProbeResult<AddressBalance> {
        let response: BalanceResponse = decode(body)?;

        if response.status != "success" {
            return Err(ProbeError::Malformed(format!("status '{}'", response.status)));
        }
        let data = response.data.ok_or_else(|| ProbeError::Malformed("missing data".to_string()))?;

        let confirmed = parse_decimal(&data.confirmed_balance)?;
        let unconfirmed = parse_decimal(&data.unconfirmed_balance)?;

        Ok(AddressBalance {
            balance: confirmed + unconfirmed,
            transaction_count: None,
        })
    }
}

#[async_trait]
impl ProviderProbe for SochainExplorer {
    fn id(&self) -> ProviderId {
        ProviderId::Sochain
    }

    async fn probe_balance(&self, address: &str) -> ProbeResult<AddressBalance> {
        let url = format!(
            "{}/get_address_balance/{}/{}",
            self.base_url,
            self.network_code,
            urlencoding::encode(address)
        );

        let body = fetch_body(self.client.get(&url)).await?;
        Self::parse_balance(&body)
    }
}
