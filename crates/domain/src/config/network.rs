use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settlement network
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// CAIP-2 identifier of the chain payments settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NetworkId {
    #[default]
    #[serde(rename = "eip155:84532")]
    BaseSepolia,
    #[serde(rename = "eip155:8453")]
    Base,
}

impl NetworkId {
    pub const fn caip2(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "eip155:84532",
            NetworkId::Base => "eip155:8453",
        }
    }

    pub const fn chain_id(self) -> u64 {
        match self {
            NetworkId::BaseSepolia => 84532,
            NetworkId::Base => 8453,
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "Base Sepolia",
            NetworkId::Base => "Base",
        }
    }

    pub const fn is_testnet(self) -> bool {
        matches!(self, NetworkId::BaseSepolia)
    }

    pub const fn default_facilitator_url(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "https://x402.org/facilitator",
            NetworkId::Base => "https://api.cdp.coinbase.com/platform/v2/x402",
        }
    }

    pub const fn default_rpc_url(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "https://sepolia.base.org",
            NetworkId::Base => "https://mainnet.base.org",
        }
    }

    pub const fn explorer_url(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "https://sepolia.basescan.org",
            NetworkId::Base => "https://basescan.org",
        }
    }

    /// USDC token contract on this chain.
    pub const fn usdc_address(self) -> &'static str {
        match self {
            NetworkId::BaseSepolia => "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            NetworkId::Base => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    #[serde(default)]
    pub id: NetworkId,
    /// Overrides the network's default facilitator.
    #[serde(default)]
    pub facilitator_url: Option<String>,
    /// Overrides the network's default JSON-RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl NetworkConfig {
    pub fn facilitator_url(&self) -> &str {
        self.facilitator_url
            .as_deref()
            .unwrap_or_else(|| self.id.default_facilitator_url())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.id.default_rpc_url())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wallet
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Env var holding the service wallet address. When unset the demo
    /// address is reported.
    #[serde(default = "d_address_env")]
    pub address_env: String,
    /// Faucet endpoint (CDP-style `POST {address, network, token}`).
    /// `None` disables faucet requests.
    #[serde(default)]
    pub faucet_url: Option<String>,
    /// Env var holding the faucet bearer token.
    #[serde(default = "d_faucet_token_env")]
    pub faucet_token_env: String,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address_env: d_address_env(),
            faucet_url: None,
            faucet_token_env: d_faucet_token_env(),
            timeout_ms: 10_000,
        }
    }
}

/// Address reported when no wallet address is configured.
pub const DEMO_WALLET_ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f5bE91";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// x402 payment gate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pay-per-request gate in front of the ad tracking routes. Disabled by
/// default; when disabled every request passes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Receiving address. Falls back to the wallet address.
    #[serde(default)]
    pub pay_to: Option<String>,
    #[serde(default = "d_click_price")]
    pub click_price: f64,
    #[serde(default = "d_impression_price")]
    pub impression_price: f64,
    #[serde(default = "d_60")]
    pub max_timeout_seconds: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pay_to: None,
            click_price: d_click_price(),
            impression_price: d_impression_price(),
            max_timeout_seconds: 60,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_address_env() -> String {
    "FELOS_WALLET_ADDRESS".into()
}
fn d_faucet_token_env() -> String {
    "CDP_API_KEY".into()
}
fn d_10000() -> u64 {
    10_000
}
fn d_60() -> u64 {
    60
}
fn d_click_price() -> f64 {
    0.001
}
fn d_impression_price() -> f64 {
    0.0001
}
