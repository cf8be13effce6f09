//! Flare FTSOv2 price feed over JSON-RPC.

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::abi;
use super::{OraclePrice, PriceSource};
use crate::error::{Result, RiskError};

pub const FLARE_CONTRACT_REGISTRY: &str = "0xaD67FE66660Fb8dFE9d6b1b4240d8650e30F6019";
pub const BTC_USD_FEED_ID: &str = "0x014254432f55534400000000000000000000000000";
pub const DEFAULT_RPC_URL: &str = "https://coston2-api.flare.network/ext/C/rpc";

/// Registry names tried in order when resolving the FtsoV2 contract
pub const FTSO_CANDIDATES: [&str; 4] = ["TestFtsoV2", "FtsoV2", "FtsoV2Interface", "TestFtsoV2Interface"];

const GET_CONTRACT_BY_NAME: &str = "getContractAddressByName(string)";
const GET_FEED_BY_ID: &str = "getFeedById(bytes21)";

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

pub struct FtsoV2Client {
    client: Client,
    rpc_url: String,
    registry: Address,
    feed_id: Vec<u8>,
    ftso_address: OnceCell<Address>,
    next_id: AtomicU64,
}

impl FtsoV2Client {
    /// BTC/USD feed through the default registry.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        Self::with_feed(rpc_url, FLARE_CONTRACT_REGISTRY, BTC_USD_FEED_ID)
    }

    pub fn with_feed(rpc_url: impl Into<String>, registry: &str, feed_id: &str) -> Result<Self> {
        let registry: Address = registry
            .parse()
            .map_err(|e| RiskError::Config(format!("invalid registry address {}: {}", registry, e)))?;
        let feed_id = abi::decode_hex(feed_id)?;
        if feed_id.len() != 21 {
            return Err(RiskError::Config(format!(
                "feed id must be 21 bytes, got {}",
                feed_id.len()
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            registry,
            feed_id,
            ftso_address: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("0x{}", hex::encode(to.as_slice())),
                    "data": format!("0x{}", hex::encode(data)),
                },
                "latest"
            ],
        });

        let res = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = res.json().await?;
        parse_rpc_result(body)
    }

    /// Look up a contract address by name in the registry.
    pub async fn contract_address(&self, name: &str) -> Result<Address> {
        let data = abi::encode_string_call(GET_CONTRACT_BY_NAME, name);
        let ret = self.eth_call(self.registry, &data).await?;
        abi::decode_address(&ret, 0)
    }

    async fn resolve_ftso(&self) -> Result<Address> {
        for candidate in FTSO_CANDIDATES {
            match self.contract_address(candidate).await {
                Ok(addr) if !addr.is_zero() => {
                    debug!(name = candidate, address = %addr, "resolved FtsoV2 contract");
                    return Ok(addr);
                }
                Ok(_) => debug!(name = candidate, "registry has no entry"),
                Err(e @ RiskError::Http(_)) => return Err(e),
                Err(e) => warn!(name = candidate, error = %e, "registry lookup failed"),
            }
        }
        Err(RiskError::Oracle(
            "could not find an FtsoV2 address in FlareContractRegistry".to_string(),
        ))
    }

    /// FtsoV2 address, resolved once and cached.
    pub async fn ftso_address(&self) -> Result<Address> {
        self.ftso_address
            .get_or_try_init(|| self.resolve_ftso())
            .await
            .copied()
    }
}

/// Decode `(uint256 value, int8 decimals, uint64 timestamp)`.
pub fn decode_feed(data: &[u8]) -> Result<OraclePrice> {
    let value = abi::decode_uint256(data, 0)?;
    let decimals = abi::decode_int8(data, 1)?;
    let timestamp = abi::decode_uint64(data, 2)?;
    let price = abi::u256_to_f64(value) / 10f64.powi(decimals as i32);
    Ok(OraclePrice {
        price,
        decimals,
        timestamp,
    })
}

#[async_trait]
impl PriceSource for FtsoV2Client {
    fn name(&self) -> &str {
        "FTSOv2"
    }

    async fn latest_price(&self) -> Result<OraclePrice> {
        let ftso = self.ftso_address().await?;
        let data = abi::encode_fixed_bytes_call(GET_FEED_BY_ID, &self.feed_id)?;
        let ret = self.eth_call(ftso, &data).await?;
        let price = decode_feed(&ret)?;
        debug!(price = price.price, timestamp = price.timestamp, "FTSOv2 price");
        Ok(price)
    }
}

/// Extract the hex result of a JSON-RPC reply, surfacing its error object.
pub fn parse_rpc_result(body: Value) -> Result<Vec<u8>> {
    let response: RpcResponse = serde_json::from_value(body)?;
    if let Some(err) = response.error {
        return Err(RiskError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    match response.result {
        Some(hex) => abi::decode_hex(&hex),
        None => Err(RiskError::Oracle("JSON-RPC response has no result".to_string())),
    }
}
