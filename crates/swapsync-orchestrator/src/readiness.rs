//! Readiness edges derived from [`ContextStatus`] transitions.

use swapsync_types::background::ContextStatus;

/// Subsystems that became available in one transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessEdges {
    pub database: bool,
    pub bitcoin_wallet: bool,
    pub monero_wallet: bool,
}

impl ReadinessEdges {
    /// False-to-true edges between two statuses. Steady state and lost
    /// availability produce no edge.
    pub fn between(before: &ContextStatus, after: &ContextStatus) -> Self {
        let rose = |b: bool, a: bool| !b && a;
        Self {
            database: rose(before.database_available, after.database_available),
            bitcoin_wallet: rose(
                before.bitcoin_wallet_available,
                after.bitcoin_wallet_available,
            ),
            monero_wallet: rose(
                before.monero_wallet_available,
                after.monero_wallet_available,
            ),
        }
    }

    pub fn any(&self) -> bool {
        self.database || self.bitcoin_wallet || self.monero_wallet
    }
}
