use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EntityStatus, Priority};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub String);

impl GoalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A goal exclusively owns its tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
    pub status: EntityStatus,
    pub target_date: Option<NaiveDate>,
    pub order: u32,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(name: impl Into<String>, target_date: Option<NaiveDate>, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: GoalId::generate(),
            name: name.into(),
            status: EntityStatus::Planned,
            target_date,
            order,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn name_matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }

    pub fn active_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.is_active())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub priority: Priority,
    pub completed: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            name: name.into(),
            priority: Priority::Medium,
            completed: false,
            archived_at: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed && self.archived_at.is_none()
    }

    pub fn name_matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}
