pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod resolver;
pub mod session;
pub mod suggestions;

pub use classifier::{
    classify, classify_with_family, normalize_date, normalize_priority, normalize_status,
    ParsedCommand,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LogFormat};
pub use domain::goal::{Goal, GoalId, Task, TaskId};
pub use domain::message::{ChatMessage, MessageId, Sender};
pub use domain::profile::{GrowthMetric, UserProfile};
pub use domain::project::{Milestone, MilestoneId, Project, ProjectId};
pub use domain::{ActionKind, EntityStatus, EntityType, Priority};
pub use errors::{CommandError, DelegateError, DelegateErrorKind};
pub use resolver::{resolve, resolve_goal, resolve_task, Resolution, Resolvable};
pub use session::{reconcile, ReconcileDecision, SkipReason, SubmissionPhase, TransitionError};
pub use suggestions::{
    suggest, ContextSnapshot, DeadlineProximity, ProjectHealth, Workload, MAX_SUGGESTIONS,
};
