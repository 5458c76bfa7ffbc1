use std::str::FromStr as _;

use secrecy::SecretString;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::serde_helpers::parse_u64_text;
use crate::signing::WalletKind;
use crate::trader::policy::TradingPolicies;

/// Public exchange deployments.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Network {
    Testnet,
    Devnet,
    Mainnet,
}

impl Network {
    #[must_use]
    pub const fn api_base(self) -> &'static str {
        match self {
            Network::Testnet => "https://api.testnet.o2.app",
            Network::Devnet => "https://api.devnet.o2.app",
            Network::Mainnet => "https://api.o2.app",
        }
    }

    pub fn host(self) -> Result<Url> {
        Ok(Url::parse(self.api_base())?)
    }
}

/// Raw signing values typically passed from app-level bot config.
#[derive(Clone, Debug)]
pub struct RawTraderConfig {
    pub private_key: SecretString,
    pub wallet_kind: String,
    /// Overrides the chain id policy when set. Decimal or `0x` hex.
    pub chain_id: Option<String>,
}

/// Trader bootstrap configuration.
#[derive(Clone, Debug)]
pub struct TraderConfig {
    pub host: Url,
    pub private_key: SecretString,
    pub wallet_kind: WalletKind,
    pub policies: TradingPolicies,
}

impl TraderConfig {
    pub fn from_raw(host: &str, raw: RawTraderConfig, policies: TradingPolicies) -> Result<Self> {
        let host = Url::parse(host)?;
        let wallet_kind = WalletKind::from_str(&raw.wallet_kind)?;
        let policies = match raw.chain_id.as_deref().map(str::trim) {
            None | Some("") => policies,
            Some(text) => {
                let chain_id = parse_u64_text(text)
                    .map_err(|e| Error::validation(format!("invalid chain_id `{text}`: {e}")))?;
                policies.with_chain_id(chain_id)
            }
        };

        Self::new(host, raw.private_key, wallet_kind, policies)
    }

    pub fn for_network(
        network: Network,
        private_key: SecretString,
        wallet_kind: WalletKind,
        policies: TradingPolicies,
    ) -> Result<Self> {
        Self::new(network.host()?, private_key, wallet_kind, policies)
    }

    pub fn new(
        host: Url,
        private_key: SecretString,
        wallet_kind: WalletKind,
        policies: TradingPolicies,
    ) -> Result<Self> {
        if !matches!(host.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "trader host must be http(s), got {host}"
            )));
        }
        policies.validate()?;

        Ok(Self {
            host,
            private_key,
            wallet_kind,
            policies,
        })
    }
}
