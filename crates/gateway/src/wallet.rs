//! Service wallet: on-chain balances over JSON-RPC and testnet faucet
//! requests.

use serde::Serialize;
use serde_json::{json, Value};

use felos_domain::config::{NetworkConfig, NetworkId, WalletConfig, DEMO_WALLET_ADDRESS};
use felos_domain::error::{Error, Result};
use felos_providers::util::{from_reqwest, http_client};

/// ERC-20 `balanceOf(address)` selector.
const BALANCE_OF: &str = "0x70a08231";
const ETH_DECIMALS: u32 = 18;
const USDC_DECIMALS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub usdc: String,
    pub eth: String,
}

/// Explorer links (or `None`) for each faucet drip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FaucetReceipt {
    pub eth: Option<String>,
    pub usdc: Option<String>,
}

pub struct WalletClient {
    http: reqwest::Client,
    network: NetworkId,
    rpc_url: String,
    address: String,
    configured: bool,
    faucet_url: Option<String>,
    faucet_token: Option<String>,
}

impl WalletClient {
    /// Reads the wallet address and faucet token from the env vars named in
    /// config. Without an address the demo address is reported.
    pub fn from_config(network: &NetworkConfig, wallet: &WalletConfig) -> Result<Self> {
        let address = env_non_empty(&wallet.address_env);
        if address.is_none() {
            tracing::warn!(
                env = %wallet.address_env,
                "no wallet address configured; reporting the demo address"
            );
        }
        Ok(Self {
            http: http_client(wallet.timeout_ms)?,
            network: network.id,
            rpc_url: network.rpc_url().to_owned(),
            configured: address.is_some(),
            address: address.unwrap_or_else(|| DEMO_WALLET_ADDRESS.to_owned()),
            faucet_url: wallet.faucet_url.clone(),
            faucet_token: env_non_empty(&wallet.faucet_token_env),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// False when the demo address stands in for a real one.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    // ── Balances ───────────────────────────────────────────────────────

    /// ETH and USDC balances. An ETH lookup failure is an error; a USDC
    /// failure reads as zero.
    pub async fn balances(&self) -> Result<Balances> {
        let eth_raw = self
            .rpc("eth_getBalance", json!([self.address, "latest"]))
            .await?;
        let eth = parse_quantity(&eth_raw)?;

        let call = json!({
            "to": self.network.usdc_address(),
            "data": balance_of_calldata(&self.address)?,
        });
        let usdc = match self.rpc("eth_call", json!([call, "latest"])).await {
            Ok(raw) => parse_quantity(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "unreadable USDC balance");
                0
            }),
            Err(e) => {
                tracing::warn!(error = %e, "USDC balance lookup failed");
                0
            }
        };

        Ok(Balances {
            usdc: format_units(usdc, USDC_DECIMALS),
            eth: format_units(eth, ETH_DECIMALS),
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<String> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!("{method}: HTTP {}", resp.status().as_u16())));
        }
        let value: Value = resp.json().await.map_err(from_reqwest)?;
        if let Some(err) = value.get("error") {
            return Err(Error::Rpc {
                method: method.to_owned(),
                message: err.to_string(),
            });
        }
        value
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Rpc {
                method: method.to_owned(),
                message: "missing result".into(),
            })
    }

    // ── Faucet ─────────────────────────────────────────────────────────

    /// Ask the faucet for ETH and USDC. Each drip is attempted
    /// independently; a failed one is logged and left out of the receipt.
    pub async fn request_faucet(&self) -> Result<FaucetReceipt> {
        if !self.network.is_testnet() {
            return Err(Error::Config(format!(
                "faucet not available on {}",
                self.network.display_name()
            )));
        }
        let url = self
            .faucet_url
            .as_deref()
            .ok_or_else(|| Error::Config("wallet.faucet_url is not set".into()))?;

        let mut receipt = FaucetReceipt::default();
        for token in ["eth", "usdc"] {
            match self.drip(url, token).await {
                Ok(hash) => {
                    let link = format!("{}/tx/{hash}", self.network.explorer_url());
                    tracing::info!(token, tx = %link, "faucet drip submitted");
                    match token {
                        "eth" => receipt.eth = Some(link),
                        _ => receipt.usdc = Some(link),
                    }
                }
                Err(e) => tracing::warn!(token, error = %e, "faucet drip failed"),
            }
        }
        Ok(receipt)
    }

    async fn drip(&self, url: &str, token: &str) -> Result<String> {
        let mut req = self.http.post(url).json(&json!({
            "address": self.address,
            "network": "base-sepolia",
            "token": token,
        }));
        if let Some(bearer) = &self.faucet_token {
            req = req.bearer_auth(bearer);
        }
        let resp = req.send().await.map_err(from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!("faucet HTTP {}: {body}", status.as_u16())));
        }
        let value: Value = resp.json().await.map_err(from_reqwest)?;
        value
            .get("transactionHash")
            .or_else(|| value.get("transaction_hash"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("faucet response without transactionHash".into()))
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

// ── Encoding helpers ─────────────────────────────────────────────────

/// `balanceOf(address)` calldata: selector plus the address left-padded to
/// 32 bytes.
pub fn balance_of_calldata(address: &str) -> Result<String> {
    let raw = address.strip_prefix("0x").unwrap_or(address);
    match hex::decode(raw) {
        Ok(bytes) if bytes.len() == 20 => Ok(format!("{BALANCE_OF}{:0>64}", hex::encode(bytes))),
        _ => Err(Error::Other(format!("not an address: {address}"))),
    }
}

/// Parse a JSON-RPC hex quantity (or a 32-byte word) into an integer.
///
/// Values are capped at `u128`: anything wider is not a real ETH or USDC
/// balance and is reported as an error.
pub fn parse_quantity(raw: &str) -> Result<u128> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(trimmed, 16)
        .map_err(|e| Error::Other(format!("bad quantity {raw}: {e}")))
}

/// Render an integer amount with `decimals` fractional digits, dropping
/// trailing zeros (`1500000`, 6 → `1.5`).
pub fn format_units(amount: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = amount / unit;
    let frac = amount % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_render_like_a_wallet() {
        assert_eq!(format_units(0, 6), "0");
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(1_000, 6), "0.001");
        assert_eq!(format_units(2_000_000_000_000_000_000, 18), "2");
        assert_eq!(format_units(10_000_000_000_000_000, 18), "0.01");
    }

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x16e360").unwrap(), 1_500_000);
        let word = format!("0x{:0>64}", "16e360");
        assert_eq!(parse_quantity(&word).unwrap(), 1_500_000);
        assert!(parse_quantity("0xzz").is_err());
        let too_wide = format!("0x1{:0>32}", "");
        assert!(parse_quantity(&too_wide).is_err());
    }

    #[test]
    fn calldata_pads_the_address() {
        let data = balance_of_calldata(DEMO_WALLET_ADDRESS).unwrap();
        assert!(data.starts_with("0x70a08231000000000000000000000000"));
        assert_eq!(data.len(), 10 + 64);
        assert!(data.ends_with("742d35cc6634c0532925a3b844bc9e7595f5be91"));
        assert!(balance_of_calldata("0x1234").is_err());
    }
}
