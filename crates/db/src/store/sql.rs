use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use waypoint_core::domain::goal::{Goal, GoalId, Task};
use waypoint_core::domain::message::{ChatMessage, MessageId, Sender};
use waypoint_core::domain::profile::UserProfile;
use waypoint_core::domain::project::{Milestone, Project, ProjectId};
use waypoint_core::domain::EntityStatus;

use super::{EntityStore, SessionStore, StoreError};
use crate::DbPool;

/// SQLite-backed entity store. Rows hold the full project aggregate as
/// JSON; an in-process cache serves the synchronous snapshot reads the
/// engine depends on.
pub struct SqlEntityStore {
    pool: DbPool,
    projects: RwLock<Vec<Project>>,
    profile: RwLock<UserProfile>,
}

impl SqlEntityStore {
    pub async fn load(pool: DbPool) -> Result<Self, StoreError> {
        let rows = sqlx::query("SELECT document FROM projects ORDER BY sort_order, created_at")
            .fetch_all(&pool)
            .await?;
        let mut projects = Vec::with_capacity(rows.len());
        for row in &rows {
            let document: String = row.try_get("document")?;
            projects.push(decode_json::<Project>(&document)?);
        }

        let profile = match sqlx::query("SELECT document FROM profiles WHERE id = 1")
            .fetch_optional(&pool)
            .await?
        {
            Some(row) => {
                let document: String = row.try_get("document")?;
                decode_json::<UserProfile>(&document)?
            }
            None => UserProfile::default(),
        };

        Ok(Self { pool, projects: RwLock::new(projects), profile: RwLock::new(profile) })
    }

    fn read_projects(&self) -> RwLockReadGuard<'_, Vec<Project>> {
        self.projects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_projects(&self) -> RwLockWriteGuard<'_, Vec<Project>> {
        self.projects.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist_project(&self, project: &Project) -> Result<(), StoreError> {
        let document =
            serde_json::to_string(project).map_err(|error| StoreError::Encode(error.to_string()))?;
        sqlx::query(
            "INSERT INTO projects (id, name, status, sort_order, document, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, status = excluded.status, \
             sort_order = excluded.sort_order, document = excluded.document, \
             updated_at = excluded.updated_at",
        )
        .bind(&project.id.0)
        .bind(&project.name)
        .bind(project.status.display())
        .bind(project.order as i64)
        .bind(document)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Applies a mutation to the cached aggregate, then writes it through.
    /// The lock is released before the write so no guard crosses an await.
    async fn mutate_project<F>(&self, id: &ProjectId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Project),
    {
        let updated = {
            let mut projects = self.write_projects();
            let project = projects
                .iter_mut()
                .find(|project| &project.id == id)
                .ok_or_else(|| StoreError::UnknownScope { scope: "project", id: id.0.clone() })?;
            apply(project);
            project.touch();
            project.clone()
        };
        self.persist_project(&updated).await
    }

    async fn mutate_goal<F>(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Goal),
    {
        self.mutate_project(project_id, |project| {
            if let Some(goal) = project.goals.iter_mut().find(|goal| &goal.id == goal_id) {
                apply(goal);
                goal.touch();
            }
        })
        .await
    }
}

#[async_trait]
impl EntityStore for SqlEntityStore {
    fn projects(&self) -> Vec<Project> {
        self.read_projects().clone()
    }

    fn profile(&self) -> UserProfile {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn add_project(&self, project: Project) -> Result<(), StoreError> {
        self.persist_project(&project).await?;
        self.write_projects().push(project);
        Ok(())
    }

    async fn update_project(&self, project: Project) -> Result<(), StoreError> {
        let id = project.id.clone();
        self.mutate_project(&id, |stored| *stored = project).await
    }

    async fn remove_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.mutate_project(id, |project| project.status = EntityStatus::Deleted).await
    }

    async fn add_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError> {
        self.mutate_project(project_id, |project| project.goals.push(goal)).await
    }

    async fn update_goal(&self, project_id: &ProjectId, goal: Goal) -> Result<(), StoreError> {
        self.mutate_project(project_id, |project| {
            if let Some(stored) = project.goals.iter_mut().find(|stored| stored.id == goal.id) {
                *stored = goal;
            }
        })
        .await
    }

    async fn remove_goal(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
    ) -> Result<(), StoreError> {
        self.mutate_goal(project_id, goal_id, |goal| goal.status = EntityStatus::Deleted).await
    }

    async fn add_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError> {
        self.mutate_goal(project_id, goal_id, |goal| goal.tasks.push(task)).await
    }

    async fn update_task(
        &self,
        project_id: &ProjectId,
        goal_id: &GoalId,
        task: Task,
    ) -> Result<(), StoreError> {
        self.mutate_goal(project_id, goal_id, |goal| {
            if let Some(stored) = goal.tasks.iter_mut().find(|stored| stored.id == task.id) {
                *stored = task;
            }
        })
        .await
    }

    async fn add_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError> {
        self.mutate_project(project_id, |project| project.milestones.push(milestone)).await
    }

    async fn update_milestone(
        &self,
        project_id: &ProjectId,
        milestone: Milestone,
    ) -> Result<(), StoreError> {
        self.mutate_project(project_id, |project| {
            if let Some(stored) =
                project.milestones.iter_mut().find(|stored| stored.id == milestone.id)
            {
                *stored = milestone;
            }
        })
        .await
    }

    async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let document =
            serde_json::to_string(&profile).map_err(|error| StoreError::Encode(error.to_string()))?;
        sqlx::query(
            "INSERT INTO profiles (id, document, updated_at) VALUES (1, ?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET document = excluded.document, \
             updated_at = excluded.updated_at",
        )
        .bind(document)
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = profile;
        Ok(())
    }
}

/// SQLite-backed durable session log with a cached snapshot.
pub struct SqlSessionStore {
    pool: DbPool,
    cache: RwLock<Vec<ChatMessage>>,
}

impl SqlSessionStore {
    pub async fn load(pool: DbPool) -> Result<Self, StoreError> {
        let store = Self { pool, cache: RwLock::new(Vec::new()) };
        store.refresh().await?;
        Ok(store)
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn refresh(&self) -> Result<(), StoreError> {
        let rows = sqlx::query(
            "SELECT id, sender, body, created_at FROM session_messages ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let messages = rows.iter().map(decode_message).collect::<Result<Vec<_>, _>>()?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = messages;
        Ok(())
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO session_messages (id, sender, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&message.id.0)
        .bind(match message.sender {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        })
        .bind(&message.text)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        self.cache.write().unwrap_or_else(PoisonError::into_inner).push(message);
        Ok(())
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|error| StoreError::Encode(error.to_string()))
}

fn decode_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, StoreError> {
    let sender = match row.try_get::<String, _>("sender")?.as_str() {
        "user" => Sender::User,
        "assistant" => Sender::Assistant,
        other => return Err(StoreError::Encode(format!("unknown sender: {other}"))),
    };
    let raw_timestamp: String = row.try_get("created_at")?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map_err(|error| StoreError::Encode(error.to_string()))?
        .with_timezone(&Utc);
    Ok(ChatMessage {
        id: MessageId(row.try_get("id")?),
        text: row.try_get("body")?,
        sender,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::{SqlEntityStore, SqlSessionStore};
    use crate::migrations::run_pending;
    use crate::store::{EntityStore, SessionStore, StoreError};
    use crate::{connect_with_settings, DbPool};
    use waypoint_core::domain::goal::Goal;
    use waypoint_core::domain::message::ChatMessage;
    use waypoint_core::domain::profile::UserProfile;
    use waypoint_core::domain::project::Project;
    use waypoint_core::domain::EntityStatus;

    async fn test_pool() -> DbPool {
        // A single connection keeps the in-memory database shared.
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn aggregates_survive_a_store_reload() {
        let pool = test_pool().await;
        let store = SqlEntityStore::load(pool.clone()).await.expect("load");

        let mut project = Project::new("Launch", 1);
        project.goals.push(Goal::new("MVP", None, 1));
        let id = project.id.clone();
        store.add_project(project).await.expect("add");
        store.remove_project(&id).await.expect("remove");

        let reloaded = SqlEntityStore::load(pool).await.expect("reload");
        let projects = reloaded.projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].status, EntityStatus::Deleted);
        assert_eq!(projects[0].goals.len(), 1);
    }

    #[tokio::test]
    async fn profile_upsert_is_single_row() {
        let pool = test_pool().await;
        let store = SqlEntityStore::load(pool.clone()).await.expect("load");

        let mut profile = UserProfile::default();
        profile.set_focus_areas(vec!["health".to_owned()]);
        store.update_profile(profile).await.expect("first write");

        let mut profile = store.profile();
        profile.set_focus_areas(vec!["career".to_owned()]);
        store.update_profile(profile).await.expect("second write");

        let reloaded = SqlEntityStore::load(pool).await.expect("reload");
        assert_eq!(reloaded.profile().focus_areas, vec!["career".to_owned()]);
    }

    #[tokio::test]
    async fn corrupt_project_documents_surface_as_errors_not_panics() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO projects (id, name, status, sort_order, document, created_at, updated_at) \
             VALUES ('p1', 'Launch', 'planned', 1, 'not json', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert");

        let result = SqlEntityStore::load(pool).await;
        assert!(matches!(result, Err(StoreError::Encode(_))));
    }

    #[tokio::test]
    async fn unknown_sender_rows_surface_as_errors_not_panics() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO session_messages (id, sender, body, created_at) \
             VALUES ('m1', 'system', 'hello', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert");

        let result = SqlSessionStore::load(pool).await;
        assert!(matches!(result, Err(StoreError::Encode(_))));
    }

    #[tokio::test]
    async fn session_log_round_trips_through_refresh() {
        let pool = test_pool().await;
        let store = SqlSessionStore::load(pool.clone()).await.expect("load");

        store.append_message(ChatMessage::user("create project 'Launch'")).await.expect("append");
        store.append_message(ChatMessage::assistant("Created.")).await.expect("append");

        let other = SqlSessionStore::load(pool).await.expect("second handle");
        let texts = other.messages().iter().map(|m| m.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["create project 'Launch'".to_owned(), "Created.".to_owned()]);
    }
}
