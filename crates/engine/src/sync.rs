use std::sync::Arc;

use tracing::debug;

use waypoint_core::domain::message::ChatMessage;
use waypoint_core::session::{reconcile, ReconcileDecision};

use waypoint_db::store::{SessionStore, StoreError};

/// Applies the transcript reconciliation policy against the durable
/// session log after each submission settles.
pub struct SessionSynchronizer {
    sessions: Arc<dyn SessionStore>,
}

impl SessionSynchronizer {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Refreshes the durable snapshot and reconciles `local` against it.
    /// Returns the replacement transcript when the durable log wins.
    pub async fn reconcile_transcript(
        &self,
        local: &[ChatMessage],
        send_in_flight: bool,
    ) -> Result<Option<Vec<ChatMessage>>, StoreError> {
        self.sessions.refresh().await?;
        let durable = self.sessions.messages();
        match reconcile(local, &durable, send_in_flight) {
            ReconcileDecision::Skip(reason) => {
                debug!(?reason, "skipping transcript reconciliation");
                Ok(None)
            }
            ReconcileDecision::Keep => Ok(None),
            ReconcileDecision::Replace(messages) => {
                debug!(count = messages.len(), "replacing local transcript from durable log");
                Ok(Some(messages))
            }
        }
    }
}
