use alloy::primitives::Address;
use clap::Args;
use ftso_lib::{FeedId, LeafEncoding, ProtocolId, Settings, FTSO_PROTOCOL_ID};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

pub const DEFAULT_RPC_URL: &str = "https://coston-api.flare.network/ext/C/rpc";
pub const DEFAULT_REGISTRY: &str = "0xaD67FE66660Fb8dFE9d6b1b4240d8650e30F6019";
pub const DEFAULT_PROVIDER_URL: &str = "https://test-data-provider.flare.rocks";

/// Ledger and data provider endpoints.
#[derive(Args, Clone)]
pub struct NetworkArgs {
    /// JSON-RPC endpoint of the ledger
    #[arg(long, env = "FLARE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: Url,

    /// Contract registry used to look up the relay
    #[arg(long, env = "FLARE_CONTRACT_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: Address,

    /// Verifier contract for the delegated path
    #[arg(long, env = "FTSO_VERIFIER_ADDRESS")]
    pub verifier: Option<Address>,

    /// Base URL of the feed data provider
    #[arg(long, env = "DATA_PROVIDER_URL", default_value = DEFAULT_PROVIDER_URL)]
    pub provider_url: Url,

    /// API key sent as `X-API-KEY`
    #[arg(long, env = "DATA_PROVIDER_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "FTSO_PROTOCOL_ID", default_value_t = FTSO_PROTOCOL_ID)]
    pub protocol_id: ProtocolId,

    /// How far back to look when picking the round to verify
    #[arg(long, env = "FTSO_LOOKBACK_SECS", default_value_t = 90_000)]
    pub lookback_secs: u64,

    /// Timeout for each ledger or provider call, 0 disables it
    #[arg(long, env = "FTSO_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Leaf layout: `packed` or `abi`
    #[arg(long, env = "FTSO_LEAF_ENCODING", default_value_t = LeafEncoding::Packed)]
    pub leaf_encoding: LeafEncoding,
}

impl NetworkArgs {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn settings(&self) -> Settings {
        Settings {
            protocol_id: self.protocol_id,
            encoding: self.leaf_encoding,
            timeout: self.timeout(),
        }
    }

    /// Unix timestamp `lookback_secs` before now.
    pub fn target_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        now.saturating_sub(self.lookback_secs)
    }
}

// Don't print API keys
impl fmt::Debug for NetworkArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkArgs")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("registry", &self.registry)
            .field("verifier", &self.verifier)
            .field("provider_url", &self.provider_url.as_str())
            .field("api_key", &"<redacted>")
            .field("protocol_id", &self.protocol_id)
            .field("lookback_secs", &self.lookback_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("leaf_encoding", &self.leaf_encoding)
            .finish()
    }
}

/// A feed given as category and name, e.g. `1:BTC/USD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSelector {
    pub category: u8,
    pub name: String,
}

impl FeedSelector {
    pub fn feed_id(&self) -> Result<FeedId, ftso_lib::EncodingError> {
        FeedId::new(self.category, &self.name)
    }
}

impl fmt::Display for FeedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

impl FromStr for FeedSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, name) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("feed `{s}` must look like <category>:<name>"))?;
        let category = category
            .trim()
            .parse()
            .map_err(|_| format!("invalid feed category `{category}`"))?;
        let selector = Self {
            category,
            name: name.trim().to_string(),
        };
        selector.feed_id().map_err(|e| e.to_string())?;
        Ok(selector)
    }
}

/// The single feed checked by `ftso-verify`.
#[derive(Args, Clone, Debug)]
pub struct FeedArgs {
    /// Feed category (1 crypto, 2 forex, 3 commodity, 4 stock)
    #[arg(long, env = "FTSO_FEED_CATEGORY", default_value_t = 1)]
    pub category: u8,

    /// Feed name, e.g. BTC/USD
    #[arg(long, env = "FTSO_FEED_NAME", default_value = "BTC/USD")]
    pub name: String,
}

impl FeedArgs {
    pub fn selector(&self) -> FeedSelector {
        FeedSelector {
            category: self.category,
            name: self.name.clone(),
        }
    }
}
