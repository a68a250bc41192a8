//! User settings that drive one-shot refreshes.

use serde::{Deserialize, Serialize};

/// Unit used to display bitcoin amounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub enum BitcoinUnit {
    #[default]
    Btc,
    Sats,
}

/// Which Monero node the wallet talks to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum MoneroNodeConfig {
    /// Let the daemon pick from its node pool.
    #[default]
    Pool,
    /// A single user-supplied node.
    SingleNode { url: String },
}

/// Settings this layer reacts to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub fetch_fiat_prices: bool,
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
    #[serde(default)]
    pub bitcoin_unit: BitcoinUnit,
    #[serde(default)]
    pub monero_node: MoneroNodeConfig,
}

fn default_fiat_currency() -> String {
    "USD".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_fiat_prices: false,
            fiat_currency: default_fiat_currency(),
            bitcoin_unit: BitcoinUnit::default(),
            monero_node: MoneroNodeConfig::default(),
        }
    }
}

/// Why a settings update was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("fiat currency must be a three-letter ISO 4217 code, got {0:?}")]
    FiatCurrency(String),

    #[error("monero node url must look like http(s)://host[:port], got {0:?}")]
    MoneroNodeUrl(String),
}

impl Settings {
    /// Check the fields the daemon would otherwise reject later.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let code = &self.fiat_currency;
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(SettingsError::FiatCurrency(code.clone()));
        }
        if let MoneroNodeConfig::SingleNode { url } = &self.monero_node {
            check_node_url(url)?;
        }
        Ok(())
    }
}

fn check_node_url(url: &str) -> Result<(), SettingsError> {
    let invalid = || SettingsError::MoneroNodeUrl(url.to_string());
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(invalid)?;
    let authority = rest.split('/').next().unwrap_or_default();
    // `[::1]` has colons but no port.
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) if !port.ends_with(']') => (host, Some(port)),
        _ => (authority, None),
    };
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }
    if let Some(port) = port {
        port.parse::<u16>().map_err(|_| invalid())?;
    }
    Ok(())
}
