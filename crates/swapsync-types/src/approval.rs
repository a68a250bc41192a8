//! Approval requests the daemon raises for user confirmation.

use serde::{Deserialize, Serialize};

use crate::RequestId;

/// Lifecycle of an approval request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Resolved,
    Rejected,
    /// No longer listed by the daemon: timed out or answered elsewhere.
    Expired,
}

impl ApprovalStatus {
    pub fn is_pending(self) -> bool {
        self == ApprovalStatus::Pending
    }

    /// Decided by the user. An expired request may still be re-listed.
    pub fn is_final(self) -> bool {
        matches!(self, ApprovalStatus::Resolved | ApprovalStatus::Rejected)
    }
}

/// A request awaiting (or having received) the user's decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: RequestId,
    /// Kind of request, e.g. "LockBitcoin", "SelectMaker", "SendMonero".
    pub request_type: String,
    /// Request details, opaque to this layer.
    #[serde(default)]
    pub content: serde_json::Value,
    pub status: ApprovalStatus,
    /// Unix timestamp after which the daemon stops waiting.
    #[serde(default)]
    pub expiration_ts: Option<u64>,
}

/// The user's answer to an approval request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub request_id: RequestId,
    pub accept: bool,
    /// Optional payload sent with an acceptance (e.g. the selected maker).
    #[serde(default)]
    pub payload: serde_json::Value,
}
