use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use waypoint_core::domain::goal::{Goal, GoalId, Task};
use waypoint_core::domain::message::ChatMessage;
use waypoint_core::domain::profile::UserProfile;
use waypoint_core::domain::project::{Milestone, Project, ProjectId};
use waypoint_core::domain::EntityStatus;

use super::{EntityStore, SessionStore, StoreError};

/// Process-local store used by engine tests and the demo CLI.
#[derive(Default)]
pub struct MemoryEntityStore {
    projects: Mutex<Vec<Project>>,
    profile: Mutex<UserProfile>,
}

impl MemoryEntityStore {
    pub fn with_projects(projects: Vec<Project>) -> Self {
        Self { projects: Mutex::new(projects), profile: Mutex::default() }
    }

    fn lock_projects(&self) -> MutexGuard<'_, Vec<Project>> {
        self.projects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_profile(&self) -> MutexGuard<'_, UserProfile> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_project<F>(&self, id: &ProjectId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Project),
    {
        let mut projects = self.lock_projects();
        let project = projects
            .iter_mut()
            .find(|project| &project.id == id)
            .ok_or_else(|| StoreError::UnknownScope { scope: "project", id: id.0.clone() })?;
        apply(project);
        project.touch();
        Ok(())
    }

    fn with_goal<F>(&self, project_id: &ProjectId, goal_id: &GoalId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Goal),
    {
        self.with_project(project_id, |project| {
            if let Some(goal) = project.goals.iter_mut().find(|goal| &goal.id == goal_id) {
                apply(goal);
                goal.touch();
            }
        })
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    fn projects(&self) -> Vec<Project> {
        self.lock_projects().clone()
    }

    fn profile(&self) -> UserProfile {
        self.lock_profile().clone()
    }

    async fn add_project(&self, project: Project) -> Result<(), StoreError> {
        self.lock_projects().push(project);
        Ok(())
    }

    async fn update_project(&self, project: Project) -> Result<(), StoreError> {
        let id = project.id.clone();
        self.with_project(&id, |stored| *stored = project)
    }

    async fn remove_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.with_project(id, |project| project.status = EntityStatus::Deleted)
    }

    async fn add_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError> {
        self.with_project(project_id, |project| project.goals.push(goal))
    }

    async fn update_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError> {
        self.with_project(project_id, |project| {
            if let Some(stored) = project.goals.iter_mut().find(|stored| stored.id == goal.id) {
                *stored = goal;
            }
        })
    }

    async fn remove_goal(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
    ) -> Result<(), StoreError> {
        self.with_goal(project_id, goal_id, |goal| goal.status = EntityStatus::Deleted)
    }

    async fn add_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError> {
        self.with_goal(project_id, goal_id, |goal| goal.tasks.push(task))
    }

    async fn update_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError> {
        self.with_goal(project_id, goal_id, |goal| {
            if let Some(stored) = goal.tasks.iter_mut().find(|stored| stored.id == task.id) {
                *stored = task;
            }
        })
    }

    async fn add_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError> {
        self.with_project(project_id, |project| project.milestones.push(milestone))
    }

    async fn update_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError> {
        self.with_project(project_id, |project| {
            if let Some(stored) =
                project.milestones.iter_mut().find(|stored| stored.id == milestone.id)
            {
                *stored = milestone;
            }
        })
    }

    async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        *self.lock_profile() = profile;
        Ok(())
    }
}

/// In-memory durable log stand-in with the same interface shape.
#[derive(Default)]
pub struct MemorySessionStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemorySessionStore {
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages: Mutex::new(messages) }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        self.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryEntityStore, MemorySessionStore};
    use crate::store::{EntityStore, SessionStore, StoreError};
    use waypoint_core::domain::goal::Goal;
    use waypoint_core::domain::message::ChatMessage;
    use waypoint_core::domain::project::{Project, ProjectId};
    use waypoint_core::domain::EntityStatus;

    #[tokio::test]
    async fn project_round_trip_and_soft_delete() {
        let store = MemoryEntityStore::default();
        let project = Project::new("Launch", 1);
        let id = project.id.clone();

        store.add_project(project).await.expect("add");
        assert_eq!(store.projects().len(), 1);

        store.remove_project(&id).await.expect("remove");
        let stored = store.projects();
        assert_eq!(stored[0].status, EntityStatus::Deleted);
    }

    #[tokio::test]
    async fn goal_mutations_touch_the_owning_project() {
        let store = MemoryEntityStore::default();
        let project = Project::new("Launch", 1);
        let id = project.id.clone();
        let before = project.updated_at;
        store.add_project(project).await.expect("add project");

        store.add_goal(&id, Goal::new("MVP", None, 1)).await.expect("add goal");
        let stored = store.projects();
        assert_eq!(stored[0].goals.len(), 1);
        assert!(stored[0].updated_at >= before);
    }

    #[tokio::test]
    async fn unknown_project_scope_is_reported() {
        let store = MemoryEntityStore::default();
        let result = store.add_goal(&ProjectId("missing".to_owned()), Goal::new("MVP", None, 1)).await;
        assert!(matches!(result, Err(StoreError::UnknownScope { scope: "project", .. })));
    }

    #[tokio::test]
    async fn session_log_appends_in_order() {
        let store = MemorySessionStore::default();
        store.append_message(ChatMessage::user("one")).await.expect("append");
        store.append_message(ChatMessage::assistant("two")).await.expect("append");
        store.refresh().await.expect("refresh");

        let texts =
            store.messages().iter().map(|message| message.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["one".to_owned(), "two".to_owned()]);
    }
}
