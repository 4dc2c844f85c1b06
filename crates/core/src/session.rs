//! Submission lifecycle and transcript reconciliation policy.
//!
//! One submission walks `Idle → Submitting → {Resolving → Executing →
//! Suggesting → Done} | {Delegating → Done} | {ErrorReported → Done}`.
//! `Done` clears the loading guard and triggers reconciliation; `Idle` is
//! both initial and terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::message::ChatMessage;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Submitting,
    Resolving,
    Executing,
    Suggesting,
    Delegating,
    ErrorReported,
    Done,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid submission transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: SubmissionPhase,
    pub to: SubmissionPhase,
}

impl SubmissionPhase {
    pub fn can_transition_to(&self, next: SubmissionPhase) -> bool {
        use SubmissionPhase::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, Resolving)
                | (Submitting, Delegating)
                | (Resolving, Executing)
                | (Executing, Suggesting)
                | (Suggesting, Done)
                | (Delegating, Done)
                // Any in-flight phase may surface an error.
                | (Submitting, ErrorReported)
                | (Resolving, ErrorReported)
                | (Executing, ErrorReported)
                | (Suggesting, ErrorReported)
                | (Delegating, ErrorReported)
                | (ErrorReported, Done)
                | (Done, Idle)
        )
    }

    pub fn transition_to(&mut self, next: SubmissionPhase) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            *self = next;
            return Ok(());
        }
        Err(TransitionError { from: *self, to: next })
    }
}

/// What the synchronizer should do with the local transcript.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileDecision {
    Skip(SkipReason),
    /// Content already matches; avoid a redundant re-render.
    Keep,
    Replace(Vec<ChatMessage>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// A send is in flight; a stale snapshot must not overwrite the
    /// just-appended optimistic message.
    SendInFlight,
    /// The durable log is empty while local messages exist; keep
    /// unsent-but-visible messages after a failed remote call.
    EmptyDurableLog,
}

/// The two-guard reconciliation policy applied after every submission.
pub fn reconcile(
    local: &[ChatMessage],
    durable: &[ChatMessage],
    send_in_flight: bool,
) -> ReconcileDecision {
    if send_in_flight {
        return ReconcileDecision::Skip(SkipReason::SendInFlight);
    }
    if durable.is_empty() && !local.is_empty() {
        return ReconcileDecision::Skip(SkipReason::EmptyDurableLog);
    }

    let normalized = normalize(durable);
    let matches = local.len() == normalized.len()
        && local.iter().zip(&normalized).all(|(ours, theirs)| ours.same_content(theirs));
    if matches {
        ReconcileDecision::Keep
    } else {
        ReconcileDecision::Replace(normalized)
    }
}

/// Durable snapshots may arrive unordered; present them by timestamp,
/// keeping arrival order for equal stamps.
fn normalize(durable: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = durable.to_vec();
    messages.sort_by_key(|message| message.timestamp);
    messages
}
