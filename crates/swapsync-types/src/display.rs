//! Display state derived from swap progress.
//!
//! Never stored; recomputed from [`crate::progress::SwapProgress`] whenever
//! the view asks for it.

use serde::{Deserialize, Serialize};

/// Which step ladder the view should render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    Happy,
    Recovery,
}

/// Which recovery ladder applies on the recovery path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryScenario {
    Generic,
    FullRefund,
    PartialRefund,
    CooperativeRedeem,
}

/// Position in a step ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct DisplayState {
    pub path: PathType,
    pub step_index: u32,
    pub is_error: bool,
    /// Present only on the recovery path.
    pub scenario: Option<RecoveryScenario>,
}

impl DisplayState {
    pub fn happy(step_index: u32, is_error: bool) -> Self {
        Self {
            path: PathType::Happy,
            step_index,
            is_error,
            scenario: None,
        }
    }

    pub fn recovery(scenario: RecoveryScenario, step_index: u32, is_error: bool) -> Self {
        Self {
            path: PathType::Recovery,
            step_index,
            is_error,
            scenario: Some(scenario),
        }
    }
}

/// `None` means there is nothing to display (no funds locked yet, or the
/// swap state could not be classified).
pub type DisplayResult = Option<DisplayState>;
