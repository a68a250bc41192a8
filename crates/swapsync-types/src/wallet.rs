//! Wallet and swap snapshots fetched from the daemon.

use serde::{Deserialize, Serialize};

use crate::{Piconero, Satoshis, SwapId, TxId};

/// Monero wallet balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneroBalance {
    pub total: Piconero,
    pub unlocked: Piconero,
}

/// Monero wallet sync position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneroSyncProgress {
    pub current_block: u64,
    pub target_block: u64,
}

impl MoneroSyncProgress {
    /// Fraction synced in percent, saturating at 100.
    pub fn percent(&self) -> u64 {
        if self.target_block == 0 {
            return 0;
        }
        (self.current_block.saturating_mul(100) / self.target_block).min(100)
    }
}

/// One incoming or outgoing Monero transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneroTransfer {
    pub tx_hash: TxId,
    pub amount: Piconero,
    pub incoming: bool,
    #[serde(default)]
    pub confirmations: u64,
}

/// Timelock position of a swap, as reported by the daemon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum SwapTimelock {
    None { blocks_left: u32 },
    Cancel { blocks_left: u32 },
    Punish,
}

/// Summary of one swap from the daemon database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInfo {
    pub swap_id: SwapId,
    /// Name of the daemon-side state the swap is persisted in.
    pub state_name: String,
    pub completed: bool,
    #[serde(default)]
    pub btc_amount: Satoshis,
    #[serde(default)]
    pub xmr_amount: Piconero,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub timelock: Option<SwapTimelock>,
}

/// Fiat prices for the currency in settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub fiat_currency: String,
    pub btc_price: f64,
    pub xmr_price: f64,
    /// BTC per XMR.
    pub xmr_btc_rate: f64,
}
