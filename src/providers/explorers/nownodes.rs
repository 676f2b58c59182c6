use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::enums::{ NetworkMode, ProviderId };
use crate::error::{ ProbeError, ProbeResult };
use crate::providers::probe::{ decode, fetch_body, litoshi_to_ltc };
use crate::providers::{ AddressBalance, ProviderProbe };

const NOWNODES_MAINNET: &str = "https://ltcbook.nownodes.io/api/v2";
const NOWNODES_TESTNET: &str = "https://ltcbook-testnet.nownodes.io/api/v2";

/// NOWNodes Blockbook instance. Balances are litoshi amounts encoded as strings.
pub struct NownodesExplorer {
    client: reqwest::Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockbookAddress {
    balance: String,
    #[serde(default)]
    unconfirmed_balance: Option<String>,
    #[serde(default)]
    txs: u64,
}

impl NownodesExplorer {
    pub fn new(client: reqwest::Client, network: NetworkMode, api_key: Option<String>) -> Self {
        let base_url = match network {
            NetworkMode::Mainnet => NOWNODES_MAINNET,
            NetworkMode::Testnet => NOWNODES_TESTNET,
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

    fn parse_address(body: &str) -> ProbeResult<AddressBalance> {
        let address: BlockbookAddress = decode(body)?;

        let confirmed = parse_litoshi(&address.balance)?;
        let unconfirmed = match &address.unconfirmed_balance {
            Some(raw) => parse_litoshi(raw)?,
            None => 0,
        };

        // Unconfirmed spends are negative.
        let total = confirmed + unconfirmed;
        if total < 0 {
            return Err(ProbeError::Malformed("negative balance".to_string()));
        }

        Ok(AddressBalance {
            balance: litoshi_to_ltc(total),
            transaction_count: Some(address.txs),
        })
    }
}

fn parse_litoshi(raw: &str) -> ProbeResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ProbeError::Malformed(format!("invalid litoshi amount '{}'", raw)))
}

#[async_trait]
impl ProviderProbe for NownodesExplorer {
    fn id(&self) -> ProviderId {
        ProviderId::Nownodes
    }

    async fn probe_balance(&self, address: &str) -> ProbeResult<AddressBalance> {
        let api_key = self.api_key.read().await.clone().ok_or(ProbeError::MissingApiKey)?;

        let url = format!("{}/address/{}", self.base_url, urlencoding::encode(address));
        let request = self.client
            .get(&url)
            .query(&[("details", "basic")])
            .header("api-key", api_key);

        let body = fetch_body(request).await?;
        Self::parse_address(&body)
    }

    async fn set_api_key(&self, api_key: Option<String>) -> ProbeResult<()> {
        *self.api_key.write().await = api_key;
        Ok(())
    }
}
