use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::goal::Goal;
use crate::domain::{EntityStatus, Priority};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MilestoneId(pub String);

impl MilestoneId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A project exclusively owns its goals and milestones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: EntityStatus,
    pub priority: Priority,
    pub order: u32,
    pub goals: Vec<Goal>,
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            description: None,
            status: EntityStatus::Planned,
            priority: Priority::Medium,
            order,
            goals: Vec::new(),
            milestones: Vec::new(),
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

    pub fn active_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|goal| goal.is_active())
    }

    pub fn active_milestones(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter().filter(|milestone| milestone.is_active())
    }

    pub fn active_task_count(&self) -> usize {
        self.active_goals().map(|goal| goal.active_tasks().count()).sum()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub status: EntityStatus,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(name: impl Into<String>, due_date: Option<NaiveDate>, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: MilestoneId::generate(),
            name: name.into(),
            due_date,
            status: EntityStatus::Planned,
            order,
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
}
