//! End-to-end submissions against the in-memory store, covering the
//! command paths, graded resolution, suggestions, delegation, and the
//! loading guard.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use waypoint_core::domain::goal::{Goal, Task};
use waypoint_core::domain::project::Project;
use waypoint_core::domain::{EntityStatus, EntityType, Priority};
use waypoint_core::errors::{CommandError, DelegateError, DelegateErrorKind};

use waypoint_db::store::{EntityStore, MemoryEntityStore, MemorySessionStore};
use waypoint_engine::{BusEvent, ChatEngine, DelegateReply, RemoteDelegate};

struct RecordingDelegate {
    calls: Mutex<Vec<String>>,
    outcome: Result<DelegateReply, DelegateError>,
    gate: Option<tokio::sync::Notify>,
}

impl RecordingDelegate {
    fn replying(reply: DelegateReply) -> Self {
        Self { calls: Mutex::new(Vec::new()), outcome: Ok(reply), gate: None }
    }

    fn failing(error: DelegateError) -> Self {
        Self { calls: Mutex::new(Vec::new()), outcome: Err(error), gate: None }
    }

    fn gated(reply: DelegateReply) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcome: Ok(reply),
            gate: Some(tokio::sync::Notify::new()),
        }
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl RemoteDelegate for RecordingDelegate {
    async fn send_message(&self, text: &str) -> Result<DelegateReply, DelegateError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(text.to_owned());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

fn engine_with(
    projects: Vec<Project>,
    delegate: Arc<RecordingDelegate>,
) -> (ChatEngine, Arc<MemoryEntityStore>) {
    let store = Arc::new(MemoryEntityStore::with_projects(projects));
    let sessions = Arc::new(MemorySessionStore::default());
    let engine = ChatEngine::new(store.clone(), sessions, delegate);
    (engine, store)
}

fn echoing() -> Arc<RecordingDelegate> {
    Arc::new(RecordingDelegate::replying(DelegateReply::text("delegated")))
}

#[tokio::test]
async fn create_project_with_description_from_scratch() {
    let (engine, store) = engine_with(Vec::new(), echoing());

    let report = engine.submit("create project 'Launch' for Q1 marketing").await;

    assert!(report.accepted);
    assert!(report.appended[0].text.contains("Launch"));
    let projects = store.projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Launch");
    assert_eq!(projects[0].description.as_deref(), Some("Q1 marketing"));
    assert_eq!(projects[0].status, EntityStatus::Planned);
    assert_eq!(projects[0].priority, Priority::Medium);
}

#[tokio::test]
async fn duplicate_project_create_is_informational() {
    let (engine, store) = engine_with(vec![Project::new("Launch", 1)], echoing());

    let report = engine.submit("create project 'Launch'").await;

    assert!(report.appended[0].text.contains("already exists"));
    assert_eq!(store.projects().len(), 1);
}

#[tokio::test]
async fn two_substring_candidates_halt_with_both_names_listed() {
    let projects = vec![Project::new("Launch Alpha", 1), Project::new("Launch Beta", 2)];
    let (engine, store) = engine_with(projects, echoing());

    let report = engine.submit("add a goal 'MVP' to Launch").await;

    let reply = &report.appended[0].text;
    assert!(reply.contains("Launch Alpha"), "reply was: {reply}");
    assert!(reply.contains("Launch Beta"), "reply was: {reply}");
    assert!(store.projects().iter().all(|project| project.goals.is_empty()));
}

#[tokio::test]
async fn lone_project_offers_itself_as_fallback_without_mutating() {
    let (engine, store) = engine_with(vec![Project::new("Launch", 1)], echoing());

    let report = engine.submit("add a goal 'MVP' to Growth").await;

    assert!(report.appended[0].text.contains("Launch"));
    assert!(store.projects()[0].goals.is_empty());
    assert!(report.suggestions.is_empty());
}

#[tokio::test]
async fn seventh_task_triggers_a_split_suggestion() {
    let mut project = Project::new("Launch", 1);
    let mut goal = Goal::new("MVP", None, 1);
    for index in 1..=6 {
        goal.tasks.push(Task::new(format!("Task {index}"), index));
    }
    project.goals.push(goal);
    let (engine, store) = engine_with(vec![project], echoing());

    let report = engine.submit("add task 'Task 7' to MVP").await;

    assert!(report.appended[0].text.contains("Task 7"));
    assert_eq!(store.projects()[0].goals[0].tasks.len(), 7);
    assert!(
        report.suggestions.iter().any(|hint| hint.contains("sub-goals")),
        "suggestions were: {:?}",
        report.suggestions
    );
}

#[tokio::test]
async fn duplicate_task_create_does_not_grow_the_goal() {
    let mut project = Project::new("Launch", 1);
    let mut goal = Goal::new("MVP", None, 1);
    goal.tasks.push(Task::new("Write docs", 1));
    project.goals.push(goal);
    let (engine, store) = engine_with(vec![project], echoing());

    let report = engine.submit("add task 'Write docs' to MVP").await;

    assert!(report.appended[0].text.contains("already exists"));
    assert_eq!(store.projects()[0].goals[0].tasks.len(), 1);
}

#[tokio::test]
async fn unmatched_text_goes_to_the_delegate() {
    let delegate = Arc::new(RecordingDelegate::replying(DelegateReply::text(
        "Here's a plan for your week.",
    )));
    let (engine, store) = engine_with(Vec::new(), delegate.clone());

    let report = engine.submit("help me plan my week").await;

    assert_eq!(delegate.calls(), vec!["help me plan my week".to_owned()]);
    assert_eq!(report.appended[0].text, "Here's a plan for your week.");
    assert!(store.projects().is_empty());
}

#[tokio::test]
async fn delegate_side_effects_reach_bus_subscribers() {
    let reply = DelegateReply {
        response: "Done.".to_owned(),
        document_generated: true,
        ..DelegateReply::default()
    };
    let delegate = Arc::new(RecordingDelegate::replying(reply));
    let (engine, _) = engine_with(Vec::new(), delegate);
    let mut events = engine.subscribe();

    engine.submit("draft a weekly review document").await;

    assert_eq!(events.recv().await.expect("event"), BusEvent::DocumentGenerated);
}

#[tokio::test]
async fn delegate_timeouts_render_as_a_network_problem() {
    let delegate = Arc::new(RecordingDelegate::failing(DelegateError::new(
        DelegateErrorKind::Network,
        "request timed out",
    )));
    let (engine, _) = engine_with(Vec::new(), delegate);

    let report = engine.submit("summarize everything for me").await;

    assert!(report.appended[0].text.contains("couldn't reach"));
}

#[tokio::test]
async fn command_errors_render_as_assistant_messages() {
    let (engine, _) = engine_with(Vec::new(), echoing());

    let report = engine.submit("delete project 'Launch'").await;

    assert!(report.accepted);
    assert!(report.appended[0].text.contains("couldn't find"));
}

#[tokio::test]
async fn second_submission_while_loading_is_dropped() {
    let delegate = Arc::new(RecordingDelegate::gated(DelegateReply::text("slow reply")));
    let (engine, _) = engine_with(Vec::new(), delegate.clone());
    let engine = Arc::new(engine);

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit("something unclassifiable").await }
    });
    // Let the first submission reach the delegate and park there.
    while delegate.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    let second = engine.submit("create project 'Launch'").await;
    assert!(!second.accepted);
    assert!(second.appended.is_empty());

    delegate.release();
    let first = first.await.expect("first submission");
    assert!(first.accepted);
    assert_eq!(delegate.calls().len(), 1);
}

#[tokio::test]
async fn shutdown_drops_a_late_delegate_reply() {
    let delegate = Arc::new(RecordingDelegate::gated(DelegateReply::text("too late")));
    let (engine, _) = engine_with(Vec::new(), delegate.clone());
    let engine = Arc::new(engine);

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit("something unclassifiable").await }
    });
    while delegate.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    engine.shutdown();
    delegate.release();

    let report = pending.await.expect("submission");
    assert!(report.accepted);
    assert!(report.appended.is_empty());
    // The user message stays; the dropped reply never lands.
    let transcript = engine.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, "something unclassifiable");
}

#[tokio::test]
async fn transcript_matches_the_durable_log_after_submissions() {
    let (engine, _) = engine_with(Vec::new(), echoing());

    engine.submit("create project 'Launch'").await;
    engine.submit("add a goal 'MVP' to Launch").await;

    let transcript = engine.transcript().await;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0].text, "create project 'Launch'");
    assert!(transcript[3].text.contains("MVP"));
}

#[tokio::test]
async fn blank_input_is_a_no_op() {
    let (engine, store) = engine_with(Vec::new(), echoing());

    let report = engine.submit("   ").await;

    assert!(!report.accepted);
    assert!(store.projects().is_empty());
    assert!(engine.transcript().await.is_empty());
}

#[tokio::test]
async fn growth_and_focus_commands_update_the_profile() {
    let (engine, store) = engine_with(Vec::new(), echoing());

    engine.submit("update growth tracker: meditation streak to 12").await;
    engine.submit("set my focus areas to health, career and learning").await;

    let profile = store.profile();
    assert_eq!(profile.growth_metrics.len(), 1);
    assert_eq!(profile.growth_metrics[0].name, "meditation streak");
    assert_eq!(profile.growth_metrics[0].value, 12.0);
    assert_eq!(
        profile.focus_areas,
        vec!["health".to_owned(), "career".to_owned(), "learning".to_owned()]
    );
}

#[tokio::test]
async fn completing_the_last_milestone_suggests_the_next_one() {
    let mut project = Project::new("Launch", 1);
    project.milestones.push(waypoint_core::domain::project::Milestone::new("Beta", None, 1));
    let (engine, store) = engine_with(vec![project], echoing());

    let report = engine.submit("complete milestone 'Beta'").await;

    assert_eq!(store.projects()[0].milestones[0].status, EntityStatus::Completed);
    assert!(
        report.suggestions.iter().any(|hint| hint.contains("next one")),
        "suggestions were: {:?}",
        report.suggestions
    );
}

#[tokio::test]
async fn configured_suggestion_cap_limits_hints() {
    let store = Arc::new(MemoryEntityStore::default());
    let sessions = Arc::new(MemorySessionStore::default());
    let engine = ChatEngine::with_suggestion_cap(store.clone(), sessions, echoing(), 1);

    let report = engine.submit("create project 'Launch'").await;

    // Without the cap a fresh project draws two hints (goals + milestone).
    assert_eq!(report.suggestions.len(), 1, "suggestions were: {:?}", report.suggestions);
}

#[tokio::test]
async fn ambiguous_matches_apply_with_the_taxonomy_warning() {
    let projects = vec![Project::new("Launch", 1), Project::new("Launch", 2)];
    let (engine, store) = engine_with(projects, echoing());

    let report = engine.submit("mark project 'Launch' as done").await;

    let expected = CommandError::AmbiguousMatch {
        kind: EntityType::Project,
        name: "Launch".to_owned(),
        match_count: 2,
    }
    .user_message();
    let reply = &report.appended[0].text;
    assert!(reply.contains(&expected), "reply was: {reply}");
    let completed = store
        .projects()
        .iter()
        .filter(|project| project.status == EntityStatus::Completed)
        .count();
    assert_eq!(completed, 1);
}
