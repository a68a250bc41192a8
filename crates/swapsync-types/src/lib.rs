//! # swapsync-types
//!
//! Shared domain types for the swap-progress synchronization layer.
//!
//! Everything the daemon pushes across the event boundary and everything the
//! view layer reads back lives here, so the interpreter, the log buffer, the
//! store and the orchestrator agree on one vocabulary.

pub mod approval;
pub mod background;
pub mod display;
pub mod events;
pub mod logs;
pub mod progress;
pub mod settings;
pub mod wallet;

/// Swap identifier as issued by the daemon (a UUID in canonical text form).
pub type SwapId = String;
/// Approval request identifier.
pub type RequestId = String;
/// Bitcoin or Monero transaction id, hex encoded.
pub type TxId = String;
/// Bitcoin amount in satoshis.
pub type Satoshis = u64;
/// Monero amount in piconero.
pub type Piconero = u64;

#[cfg(test)]
mod tests {
    #[test]
    #[ignore] // Run manually to generate bindings
    fn export_ts_bindings() {
        use ts_rs::TS;
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bindings");
        std::fs::create_dir_all(&dir).expect("create bindings dir");
        crate::display::DisplayState::export_all_to(&dir).expect("export DisplayState");
        crate::settings::BitcoinUnit::export_all_to(&dir).expect("export BitcoinUnit");
    }
}
