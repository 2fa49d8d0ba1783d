//! The `{ success, message }` envelope every matching operation returns.

use serde::{Deserialize, Serialize};

use super::messages::{template_for, MatchOperation};

/// Why a business-path operation reported `success = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Current state does not permit the transition. Retry after it changes.
    Conflict,
    /// The durable write did not complete. Nothing was applied.
    PersistenceFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl MatchOutcome {
    pub fn succeeded(operation: MatchOperation, counterpart_name: &str) -> Self {
        Self {
            success: true,
            message: template_for(operation, true).render(counterpart_name),
            reason: None,
        }
    }

    pub fn failed(operation: MatchOperation, counterpart_name: &str, reason: FailureReason) -> Self {
        Self {
            success: false,
            message: template_for(operation, false).render(counterpart_name),
            reason: Some(reason),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.reason == Some(FailureReason::Conflict)
    }
}
