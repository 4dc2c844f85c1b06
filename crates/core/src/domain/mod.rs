use serde::{Deserialize, Serialize};

pub mod goal;
pub mod message;
pub mod profile;
pub mod project;

/// Lifecycle status shared by projects, goals, and milestones.
///
/// `Deleted` and `Completed` entities are excluded from the active pools
/// used for name resolution and duplicate checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    Planned,
    InProgress,
    Completed,
    Deleted,
}

impl EntityStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Completed | Self::Deleted)
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn display(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// The kind of entity a command addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Project,
    Goal,
    Task,
    Milestone,
}

impl EntityType {
    pub fn display(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Goal => "goal",
            Self::Task => "task",
            Self::Milestone => "milestone",
        }
    }
}

/// What a successfully executed command did to its entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Created,
    Updated,
    Deleted,
    Completed,
    Prioritized,
}
