//! Store handles the engine mutates through.
//!
//! Snapshot reads are synchronous so resolution and suggestion generation
//! operate on one consistent view; mutators are asynchronous and must be
//! awaited before any follow-up work runs.

use async_trait::async_trait;
use thiserror::Error;

use waypoint_core::domain::goal::{Goal, GoalId, Task};
use waypoint_core::domain::message::ChatMessage;
use waypoint_core::domain::profile::UserProfile;
use waypoint_core::domain::project::{Milestone, Project, ProjectId};

pub mod memory;
pub mod sql;

pub use memory::{MemoryEntityStore, MemorySessionStore};
pub use sql::{SqlEntityStore, SqlSessionStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("unknown {scope}: {id}")]
    UnknownScope { scope: &'static str, id: String },
}

/// Persistent project/goal/task/milestone state plus the user profile.
#[async_trait]
pub trait EntityStore: Send + Sync {
    fn projects(&self) -> Vec<Project>;
    fn profile(&self) -> UserProfile;

    async fn add_project(&self, project: Project) -> Result<(), StoreError>;
    async fn update_project(&self, project: Project) -> Result<(), StoreError>;
    /// Soft delete: the project stays on disk with status `Deleted`.
    async fn remove_project(&self, id: &ProjectId) -> Result<(), StoreError>;

    async fn add_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError>;
    async fn update_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError>;
    async fn remove_goal(&self, project_id: &ProjectId, goal_id: &GoalId)
        -> Result<(), StoreError>;

    async fn add_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError>;
    async fn update_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError>;

    async fn add_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError>;
    async fn update_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError>;

    async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError>;
}

/// Durable, append-only session log behind the optimistic transcript.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Re-read the durable snapshot. A no-op for in-memory sessions.
    async fn refresh(&self) -> Result<(), StoreError>;
    fn messages(&self) -> Vec<ChatMessage>;
    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError>;
}
