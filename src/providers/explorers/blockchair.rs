use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::enums::{ NetworkMode, ProviderId };
use crate::error::{ ProbeError, ProbeResult };
use crate::providers::probe::{ decode, fetch_body, litoshi_to_ltc };
use crate::providers::{ AddressBalance, ProviderProbe };

const BLOCKCHAIR_MAINNET: &str = "https://api.blockchair.com/litecoin";
const BLOCKCHAIR_TESTNET: &str = "https://api.blockchair.com/litecoin/testnet";

/// Blockchair address dashboard. Balances come back as litoshi integers.
pub struct BlockchairExplorer {
    client: reqwest::Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    data: HashMap<String, DashboardEntry>,
}

#[derive(Debug, Deserialize)]
struct DashboardEntry {
    address: DashboardAddress,
}

#[derive(Debug, Deserialize)]
struct DashboardAddress {
    balance: i64,
    transaction_count: u64,
}

impl BlockchairExplorer {
    pub fn new(client: reqwest::Client, network: NetworkMode, api_key: Option<String>) -> Self {
        let base_url = match network {
            NetworkMode::Mainnet => BLOCKCHAIR_MAINNET,
            NetworkMode::Testnet => BLOCKCHAIR_TESTNET,
        };
        Self::with_base_url(client, base_url, api_key)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: RwLock::new(api_key),
        }
    }

    fn parse_dashboard(body: &str, address: &str) -> ProbeResult<AddressBalance> {
        let response: DashboardResponse = decode(body)?;

        // Keys are echoed back as sent; fall back to the only entry if the case differs.
        let entry = match response.data.get(address) {
            Some(entry) => entry,
            None if response.data.len() == 1 => {
                response.data
                    .values()
                    .next()
                    .ok_or_else(|| ProbeError::Malformed("empty data".to_string()))?
            }
            None => {
                return Err(ProbeError::Malformed(format!("address {} missing from response", address)));
            }
        };

        if entry.address.balance < 0 {
            return Err(ProbeError::Malformed("negative balance".to_string()));
        }

        Ok(AddressBalance {
            balance: litoshi_to_ltc(entry.address.balance),
            transaction_count: Some(entry.address.transaction_count),
        })
    }
}

#[async_trait]
impl ProviderProbe for BlockchairExplorer {
    fn id(&self) -> ProviderId {
        ProviderId::Blockchair
    }

    async fn probe_balance(&self, address: &str) -> ProbeResult<AddressBalance> {
        let url = format!(
            "{}/dashboards/address/{}",
            self.base_url,
            urlencoding::encode(address)
        );

        let mut request = self.client.get(&url);
        if let Some(key) = self.api_key.read().await.as_deref() {
            request = request.query(&[("key", key)]);
        }

        let body = fetch_body(request).await?;
        Self::parse_dashboard(&body, address)
    }

    async fn set_api_key(&self, api_key: Option<String>) -> ProbeResult<()> {
        *self.api_key.write().await = api_key;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::prelude::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_parse_dashboard_normalizes_litoshi() {
        let body =
            r#"{
            "data": {
                "ltc1qtest": {
                    "address": { "type": "witness_v0_keyhash", "balance": 250000000, "transaction_count": 7 },
                    "transactions": []
                }
            },
            "context": { "code": 200 }
        }"#;

        let balance = BlockchairExplorer::parse_dashboard(body, "ltc1qtest").unwrap();
        assert_eq!(balance.balance, Decimal::from_str("2.5").unwrap());
        assert_eq!(balance.transaction_count, Some(7));
    }

    #[test]
    fn test_parse_dashboard_rejects_unexpected_shape() {
        let body = r#"{ "data": [], "context": { "code": 430, "error": "limit reached" } }"#;
        assert!(matches!(
            BlockchairExplorer::parse_dashboard(body, "ltc1qtest"),
            Err(ProbeError::Malformed(_))
        ));
    }
}
