use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info_span, warn, Instrument};

use waypoint_core::classifier::classify_with_family;
use waypoint_core::domain::message::ChatMessage;
use waypoint_core::errors::CommandError;
use waypoint_core::session::SubmissionPhase;
use waypoint_core::suggestions::{suggest, MAX_SUGGESTIONS};

use waypoint_db::store::{EntityStore, SessionStore};

use crate::bus::{BusEvent, NotificationBus};
use crate::delegate::{DelegateReply, RemoteDelegate};
use crate::executor::{ActionExecutor, ExecutionOutcome};
use crate::sync::SessionSynchronizer;

/// What one call to [`ChatEngine::submit`] produced.
#[derive(Clone, Debug, Default)]
pub struct SubmissionReport {
    /// False when the loading guard rejected the submission or the
    /// input was blank; nothing was appended in that case.
    pub accepted: bool,
    /// Assistant messages appended this submission, in order.
    pub appended: Vec<ChatMessage>,
    pub suggestions: Vec<String>,
}

impl SubmissionReport {
    fn rejected() -> Self {
        Self::default()
    }
}

/// The conversational command pipeline. One engine serves one session;
/// submissions are serialized by the loading guard, never queued.
pub struct ChatEngine {
    store: Arc<dyn EntityStore>,
    sessions: Arc<dyn SessionStore>,
    delegate: Arc<dyn RemoteDelegate>,
    executor: ActionExecutor,
    synchronizer: SessionSynchronizer,
    bus: NotificationBus,
    transcript: Mutex<Vec<ChatMessage>>,
    suggestion_cap: usize,
    loading: AtomicBool,
    alive: AtomicBool,
}

impl ChatEngine {
    pub fn new(
        store: Arc<dyn EntityStore>,
        sessions: Arc<dyn SessionStore>,
        delegate: Arc<dyn RemoteDelegate>,
    ) -> Self {
        Self::with_suggestion_cap(store, sessions, delegate, MAX_SUGGESTIONS)
    }

    /// Build an engine with a configured hint cap. The cap can only
    /// tighten the ceiling, never raise it.
    pub fn with_suggestion_cap(
        store: Arc<dyn EntityStore>,
        sessions: Arc<dyn SessionStore>,
        delegate: Arc<dyn RemoteDelegate>,
        suggestion_cap: usize,
    ) -> Self {
        let executor = ActionExecutor::new(Arc::clone(&store));
        let synchronizer = SessionSynchronizer::new(Arc::clone(&sessions));
        Self {
            store,
            sessions,
            delegate,
            executor,
            synchronizer,
            bus: NotificationBus::default(),
            transcript: Mutex::new(Vec::new()),
            suggestion_cap: suggestion_cap.min(MAX_SUGGESTIONS),
            loading: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    /// Drops any in-flight delegate reply instead of applying it.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }

    /// Runs one submission end to end. Never fails from the caller's
    /// point of view: command errors render as assistant messages.
    pub async fn submit(&self, text: &str) -> SubmissionReport {
        let text = text.trim();
        if text.is_empty() {
            return SubmissionReport::rejected();
        }
        // At most one in-flight submission; later ones are dropped, not queued.
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("submission rejected while another is in flight");
            return SubmissionReport::rejected();
        }

        let span = info_span!("submission", chars = text.len());
        let report = self.run_submission(text).instrument(span).await;
        self.loading.store(false, Ordering::SeqCst);

        if self.alive.load(Ordering::SeqCst) {
            self.reconcile().await;
        }
        report
    }

    async fn run_submission(&self, text: &str) -> SubmissionReport {
        let mut phase = SubmissionPhase::Idle;
        advance(&mut phase, SubmissionPhase::Submitting);

        let user_message = ChatMessage::user(text);
        self.append(user_message).await;

        let (appended, suggestions) = match classify_with_family(text) {
            Some((family, command)) => {
                debug!(family, "classified command locally");
                advance(&mut phase, SubmissionPhase::Resolving);
                advance(&mut phase, SubmissionPhase::Executing);
                let today = Utc::now().date_naive();
                match self.executor.execute(command, today).await {
                    Ok(outcome) => {
                        advance(&mut phase, SubmissionPhase::Suggesting);
                        let suggestions = self.suggestions_for(&outcome);
                        (vec![ChatMessage::assistant(outcome.reply)], suggestions)
                    }
                    Err(error) => {
                        warn!(%error, "command failed; reporting to the user");
                        advance(&mut phase, SubmissionPhase::ErrorReported);
                        (vec![ChatMessage::assistant(error.user_message())], Vec::new())
                    }
                }
            }
            None => {
                debug!("no pattern matched; delegating");
                advance(&mut phase, SubmissionPhase::Delegating);
                match self.delegate.send_message(text).await {
                    Ok(reply) => {
                        if !self.alive.load(Ordering::SeqCst) {
                            debug!("engine shut down mid-delegation; dropping reply");
                            return SubmissionReport { accepted: true, ..Default::default() };
                        }
                        self.publish_side_effects(&reply);
                        (vec![ChatMessage::assistant(reply.response)], Vec::new())
                    }
                    Err(delegate_error) => {
                        error!(%delegate_error, "delegate call failed");
                        let rendered = CommandError::from(delegate_error).user_message();
                        advance(&mut phase, SubmissionPhase::ErrorReported);
                        (vec![ChatMessage::assistant(rendered)], Vec::new())
                    }
                }
            }
        };

        advance(&mut phase, SubmissionPhase::Done);
        for message in &appended {
            self.append(message.clone()).await;
        }
        SubmissionReport { accepted: true, appended, suggestions }
    }

    fn suggestions_for(&self, outcome: &ExecutionOutcome) -> Vec<String> {
        match (&outcome.subject, &outcome.context) {
            (Some((entity, action)), Some(context)) => {
                let mut hints = suggest(*entity, *action, context);
                hints.truncate(self.suggestion_cap);
                hints
            }
            _ => Vec::new(),
        }
    }

    fn publish_side_effects(&self, reply: &DelegateReply) {
        if !reply.entities_created.is_empty() {
            let summaries =
                reply.entities_created.iter().map(|entity| entity.summary()).collect();
            self.bus.publish(BusEvent::EntitiesCreated { summaries });
        }
        if reply.document_generated {
            self.bus.publish(BusEvent::DocumentGenerated);
        }
        if reply.priority_stream_created {
            self.bus.publish(BusEvent::PriorityStreamCreated);
        }
        if reply.milestones_created {
            self.bus.publish(BusEvent::MilestonesCreated);
        }
    }

    /// Optimistic append: local transcript first, then the durable log.
    /// A durable write failure keeps the local message; the empty-log
    /// reconciliation guard protects it from being wiped afterwards.
    async fn append(&self, message: ChatMessage) {
        self.transcript.lock().await.push(message.clone());
        if let Err(error) = self.sessions.append_message(message).await {
            warn!(%error, "failed to persist a session message");
        }
    }

    async fn reconcile(&self) {
        let mut transcript = self.transcript.lock().await;
        match self.synchronizer.reconcile_transcript(&transcript, false).await {
            Ok(Some(replacement)) => *transcript = replacement,
            Ok(None) => {}
            Err(error) => warn!(%error, "transcript reconciliation failed"),
        }
    }
}

/// Transitions are valid by construction; a violation is a programming
/// error worth a log line, not a panic.
fn advance(phase: &mut SubmissionPhase, next: SubmissionPhase) {
    if let Err(error) = phase.transition_to(next) {
        warn!(%error, "submission phase fell out of sequence");
    }
}
