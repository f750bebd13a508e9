//! Mutating-operation lifecycle.
//!
//! # State Machine
//! ```text
//! Draft → Validated → Submitted → Confirmed | Reverted
//!              │           └──→ TimedOut ──→ (wait again)
//!              └──→ Declined | Reverted  (rejected at submission)
//! ```
//! Only `Draft → Validated` can fail on client-side input. Everything after
//! is driven by the ledger. Nothing is resubmitted automatically.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::gateway::contract::Submission;
use crate::gateway::types::{GatewayError, GatewayResult, ListingId, Settlement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Purchase,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Purchase => "purchase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Draft,
    Validated,
    Submitted,
    Confirmed,
    Declined,
    Reverted,
    TimedOut,
}

impl OperationState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: OperationState) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Draft, Validated)
                | (Validated, Submitted)
                | (Validated, Declined)
                | (Validated, Reverted)
                | (Submitted, Confirmed)
                | (Submitted, Reverted)
                | (Submitted, TimedOut)
                | (TimedOut, Confirmed)
                | (TimedOut, Reverted)
                | (TimedOut, TimedOut)
        )
    }

    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Declined | Self::Reverted)
    }

    /// The ledger may still apply the operation.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitted | Self::TimedOut)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Validated => "validated",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Reverted => "reverted",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// A state change submitted (or about to be) on behalf of one account.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    id: Uuid,
    kind: OperationKind,
    target_id: Option<ListingId>,
    submitted_account: Address,
    submitted_value: U256,
    state: OperationState,
    submission: Option<Submission>,
    settlement: Option<Settlement>,
}

impl PendingOperation {
    /// A draft bound to the account captured at creation time.
    pub fn draft(
        kind: OperationKind,
        target_id: Option<ListingId>,
        account: Address,
        value: U256,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target_id,
            submitted_account: account,
            submitted_value: value,
            state: OperationState::Draft,
            submission: None,
            settlement: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target_id(&self) -> Option<ListingId> {
        self.target_id
    }

    pub fn submitted_account(&self) -> Address {
        self.submitted_account
    }

    pub fn submitted_value(&self) -> U256 {
        self.submitted_value
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.submission.as_ref().map(|s| s.tx_hash)
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub(crate) fn transition(&mut self, next: OperationState) -> GatewayResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(GatewayError::InvalidTransition(format!(
                "{} operation {} cannot move from {} to {}",
                self.kind.as_str(),
                self.id,
                self.state,
                next
            )));
        }
        tracing::debug!(
            operation = %self.id,
            kind = self.kind.as_str(),
            from = %self.state,
            to = %next,
            "Operation state change"
        );
        self.state = next;
        Ok(())
    }

    pub(crate) fn mark_submitted(&mut self, submission: Submission) -> GatewayResult<()> {
        self.transition(OperationState::Submitted)?;
        self.submission = Some(submission);
        Ok(())
    }

    pub(crate) fn mark_confirmed(&mut self, settlement: Settlement) -> GatewayResult<()> {
        self.transition(OperationState::Confirmed)?;
        self.settlement = Some(settlement);
        Ok(())
    }
}
