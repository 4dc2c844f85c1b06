use std::sync::Arc;

use chrono::NaiveDate;

use waypoint_core::classifier::ParsedCommand;
use waypoint_core::domain::goal::{Goal, Task};
use waypoint_core::domain::project::{Milestone, Project};
use waypoint_core::domain::{ActionKind, EntityStatus, EntityType, Priority};
use waypoint_core::errors::CommandError;
use waypoint_core::resolver::{resolve, resolve_goal, resolve_task, Resolution, Resolvable};
use waypoint_core::suggestions::ContextSnapshot;

use waypoint_db::store::{EntityStore, StoreError};

/// Result of running one parsed command against the store.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    /// Confirmation (or explanation) to append as an assistant message.
    pub reply: String,
    /// Key into the suggestion rule table, when a mutation happened.
    pub subject: Option<(EntityType, ActionKind)>,
    pub context: Option<ContextSnapshot>,
}

impl ExecutionOutcome {
    fn halted(reply: String) -> Self {
        Self { reply, subject: None, context: None }
    }
}

/// Auto-apply decision for a graded resolution.
///
/// `Resolved` and `FuzzyResolved` apply as-is; `AmbiguousResolved`
/// applies with a warning appended to the reply; `SuggestedFallback`
/// halts with its confirmation prompt and mutates nothing; the rest
/// surface as `NotFound`.
enum Gated<'a, T> {
    Apply { entity: &'a T, warning: Option<String> },
    Halt(String),
}

fn gate<'a, T: Resolvable>(
    resolution: Resolution<'a, T>,
    kind: EntityType,
    query: &str,
) -> Result<Gated<'a, T>, CommandError> {
    match resolution {
        Resolution::Resolved(entity) => Ok(Gated::Apply { entity, warning: None }),
        Resolution::AmbiguousResolved { entity, match_count } => Ok(Gated::Apply {
            entity,
            // The warning is the taxonomy rendering, so the two never drift.
            warning: Some(
                CommandError::AmbiguousMatch { kind, name: query.trim().to_owned(), match_count }
                    .user_message(),
            ),
        }),
        Resolution::FuzzyResolved(entity) => Ok(Gated::Apply {
            entity,
            warning: Some(format!("Matched '{}'.", entity.display_name())),
        }),
        Resolution::SuggestedFallback { prompt, .. } => Ok(Gated::Halt(prompt)),
        Resolution::NotFound { suggestions } => Err(CommandError::NotFound {
            kind,
            name: query.trim().to_owned(),
            suggestions,
        }),
        Resolution::NoCandidates => Err(CommandError::NotFound {
            kind,
            name: query.trim().to_owned(),
            suggestions: Vec::new(),
        }),
    }
}

fn with_warning(base: String, warning: Option<String>) -> String {
    match warning {
        Some(warning) => format!("{base} {warning}"),
        None => base,
    }
}

fn persist(error: StoreError) -> CommandError {
    CommandError::Persistence(error.to_string())
}

/// Runs parsed commands against the entity store. Holds no state of its
/// own; every call re-reads the current snapshot.
pub struct ActionExecutor {
    store: Arc<dyn EntityStore>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: ParsedCommand,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        match command {
            ParsedCommand::CreateProject { name, description } => {
                self.create_project(name, description, today).await
            }
            ParsedCommand::UpdateProject { project_name, status, priority } => {
                self.update_project(project_name, status, priority, today).await
            }
            ParsedCommand::DeleteProject { project_name } => {
                self.delete_project(project_name, today).await
            }
            ParsedCommand::UpdateGrowthTracker { metric, value } => {
                self.update_growth_tracker(metric, value).await
            }
            ParsedCommand::UpdateFocusAreas { areas } => self.update_focus_areas(areas).await,
            ParsedCommand::CreateGoal { goal_title, project_name, target_date } => {
                self.create_goal(goal_title, project_name, target_date, today).await
            }
            ParsedCommand::UpdateGoal { goal_title, status, target_date } => {
                self.update_goal(goal_title, status, target_date, today).await
            }
            ParsedCommand::CreateTask { task_name, goal_title } => {
                self.create_task(task_name, goal_title, today).await
            }
            ParsedCommand::PrioritizeTask { task_name, priority } => {
                self.prioritize_task(task_name, priority, today).await
            }
            ParsedCommand::CreateMilestone { milestone_name, project_name, due_date } => {
                self.create_milestone(milestone_name, project_name, due_date, today).await
            }
            ParsedCommand::CompleteMilestone { milestone_name } => {
                self.complete_milestone(milestone_name, today).await
            }
        }
    }

    /// Snapshot taken after the mutation so health reflects what landed.
    fn snapshot(
        &self,
        subject_name: &str,
        today: NaiveDate,
        affected_project: Option<&waypoint_core::domain::project::ProjectId>,
        goal_task_count: Option<usize>,
        nearest_due: Option<NaiveDate>,
    ) -> ContextSnapshot {
        let projects = self.store.projects();
        let profile = self.store.profile();
        let affected =
            affected_project.and_then(|id| projects.iter().find(|project| &project.id == id));
        ContextSnapshot::capture(
            subject_name,
            today,
            &projects,
            &profile,
            affected,
            goal_task_count,
            nearest_due,
        )
    }

    async fn create_project(
        &self,
        name: String,
        description: Option<String>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        if let Some(existing) =
            projects.iter().find(|project| project.is_active() && project.name_matches(&name))
        {
            let id = existing.id.clone();
            let reply = format!("Project '{}' already exists; nothing new created.", existing.name);
            let context = self.snapshot(&existing.name, today, Some(&id), None, None);
            return Ok(ExecutionOutcome {
                reply,
                subject: Some((EntityType::Project, ActionKind::Created)),
                context: Some(context),
            });
        }

        let mut project = Project::new(name, projects.len() as u32 + 1);
        project.description = description;
        let id = project.id.clone();
        let reply = format!("Created project '{}'.", project.name);
        let subject_name = project.name.clone();
        self.store.add_project(project).await.map_err(persist)?;

        let context = self.snapshot(&subject_name, today, Some(&id), None, None);
        Ok(ExecutionOutcome {
            reply,
            subject: Some((EntityType::Project, ActionKind::Created)),
            context: Some(context),
        })
    }

    async fn update_project(
        &self,
        project_name: String,
        status: Option<EntityStatus>,
        priority: Option<Priority>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let resolution = resolve(&project_name, EntityType::Project, projects.iter());
        let (mut project, warning) =
            match gate(resolution, EntityType::Project, &project_name)? {
                Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
                Gated::Apply { entity, warning } => (entity.clone(), warning),
            };

        let mut changes = Vec::new();
        if let Some(status) = status {
            project.status = status;
            changes.push(format!("status to {}", status.display()));
        }
        if let Some(priority) = priority {
            project.priority = priority;
            changes.push(format!("priority to {}", priority.display()));
        }
        if changes.is_empty() {
            return Err(CommandError::Validation(
                "no recognizable change for that project".to_owned(),
            ));
        }

        let id = project.id.clone();
        let subject_name = project.name.clone();
        let reply = with_warning(
            format!("Updated project '{}': set {}.", subject_name, changes.join(", ")),
            warning,
        );
        self.store.update_project(project).await.map_err(persist)?;

        let context = self.snapshot(&subject_name, today, Some(&id), None, None);
        Ok(ExecutionOutcome {
            reply,
            subject: Some((EntityType::Project, ActionKind::Updated)),
            context: Some(context),
        })
    }

    async fn delete_project(
        &self,
        project_name: String,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let resolution = resolve(&project_name, EntityType::Project, projects.iter());
        let (id, name, warning) = match gate(resolution, EntityType::Project, &project_name)? {
            Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
            Gated::Apply { entity, warning } => {
                (entity.id.clone(), entity.name.clone(), warning)
            }
        };

        self.store.remove_project(&id).await.map_err(persist)?;
        let context = self.snapshot(&name, today, None, None, None);
        Ok(ExecutionOutcome {
            reply: with_warning(format!("Deleted project '{name}'."), warning),
            subject: Some((EntityType::Project, ActionKind::Deleted)),
            context: Some(context),
        })
    }

    async fn update_growth_tracker(
        &self,
        metric: String,
        value: f64,
    ) -> Result<ExecutionOutcome, CommandError> {
        let mut profile = self.store.profile();
        profile.record_metric(&metric, value);
        self.store.update_profile(profile).await.map_err(persist)?;
        Ok(ExecutionOutcome {
            reply: format!("Recorded growth metric '{metric}' at {value}."),
            subject: None,
            context: None,
        })
    }

    async fn update_focus_areas(
        &self,
        areas: Vec<String>,
    ) -> Result<ExecutionOutcome, CommandError> {
        let areas = areas
            .into_iter()
            .map(|area| area.trim().to_owned())
            .filter(|area| !area.is_empty())
            .collect::<Vec<_>>();
        if areas.is_empty() {
            return Err(CommandError::Validation(
                "focus areas cannot be set to an empty list".to_owned(),
            ));
        }

        let mut profile = self.store.profile();
        let listed = areas.join(", ");
        profile.set_focus_areas(areas);
        self.store.update_profile(profile).await.map_err(persist)?;
        Ok(ExecutionOutcome {
            reply: format!("Updated your focus areas to: {listed}."),
            subject: None,
            context: None,
        })
    }

    async fn create_goal(
        &self,
        goal_title: String,
        project_name: Option<String>,
        target_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (project, warning) = match project_name {
            Some(query) => {
                let resolution = resolve(&query, EntityType::Project, projects.iter());
                match gate(resolution, EntityType::Project, &query)? {
                    Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
                    Gated::Apply { entity, warning } => (entity, warning),
                }
            }
            None => match most_recent_project(&projects) {
                Some(project) => (project, None),
                None => {
                    return Err(CommandError::Validation(
                        "there is no active project to attach that goal to".to_owned(),
                    ))
                }
            },
        };

        let project_id = project.id.clone();
        let project_label = project.name.clone();

        if let Some(existing) =
            project.goals.iter().find(|goal| goal.is_active() && goal.name_matches(&goal_title))
        {
            // Idempotent upsert: refresh supplied fields on the match.
            let mut updated = existing.clone();
            if target_date.is_some() {
                updated.target_date = target_date;
            }
            let goal_task_count = updated.active_tasks().count();
            let nearest_due = updated.target_date;
            let subject_name = updated.name.clone();
            self.store.update_goal(&project_id, updated).await.map_err(persist)?;

            let context = self.snapshot(
                &subject_name,
                today,
                Some(&project_id),
                Some(goal_task_count),
                nearest_due,
            );
            return Ok(ExecutionOutcome {
                reply: with_warning(
                    format!(
                        "Goal '{subject_name}' already exists in '{project_label}'; refreshed it."
                    ),
                    warning,
                ),
                subject: Some((EntityType::Goal, ActionKind::Updated)),
                context: Some(context),
            });
        }

        let order = project.goals.len() as u32 + 1;
        let goal = Goal::new(goal_title, target_date, order);
        let subject_name = goal.name.clone();
        let nearest_due = goal.target_date;
        self.store.add_goal(&project_id, goal).await.map_err(persist)?;

        let context =
            self.snapshot(&subject_name, today, Some(&project_id), Some(0), nearest_due);
        Ok(ExecutionOutcome {
            reply: with_warning(
                format!("Added goal '{subject_name}' to '{project_label}'."),
                warning,
            ),
            subject: Some((EntityType::Goal, ActionKind::Created)),
            context: Some(context),
        })
    }

    async fn update_goal(
        &self,
        goal_title: String,
        status: Option<EntityStatus>,
        target_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (owner, resolution) = resolve_goal(&goal_title, None, &projects);
        let (mut goal, warning) = match gate(resolution, EntityType::Goal, &goal_title)? {
            Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
            Gated::Apply { entity, warning } => (entity.clone(), warning),
        };
        let Some(owner) = owner else {
            return Err(CommandError::NotFound {
                kind: EntityType::Goal,
                name: goal_title.trim().to_owned(),
                suggestions: Vec::new(),
            });
        };

        let mut changes = Vec::new();
        if let Some(status) = status {
            goal.status = status;
            changes.push(format!("status to {}", status.display()));
        }
        if let Some(date) = target_date {
            goal.target_date = Some(date);
            changes.push(format!("target date to {date}"));
        }
        if changes.is_empty() {
            return Err(CommandError::Validation(
                "no recognizable change for that goal".to_owned(),
            ));
        }

        let project_id = owner.id.clone();
        let subject_name = goal.name.clone();
        let goal_task_count = goal.active_tasks().count();
        let nearest_due = goal.target_date;
        let reply = with_warning(
            format!("Updated goal '{}': set {}.", subject_name, changes.join(", ")),
            warning,
        );
        self.store.update_goal(&project_id, goal).await.map_err(persist)?;

        let context = self.snapshot(
            &subject_name,
            today,
            Some(&project_id),
            Some(goal_task_count),
            nearest_due,
        );
        Ok(ExecutionOutcome {
            reply,
            subject: Some((EntityType::Goal, ActionKind::Updated)),
            context: Some(context),
        })
    }

    async fn create_task(
        &self,
        task_name: String,
        goal_title: Option<String>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (owner, goal, warning) = match goal_title {
            Some(query) => {
                let (owner, resolution) = resolve_goal(&query, None, &projects);
                match gate(resolution, EntityType::Goal, &query)? {
                    Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
                    Gated::Apply { entity, warning } => {
                        let Some(owner) = owner else {
                            return Err(CommandError::NotFound {
                                kind: EntityType::Goal,
                                name: query.trim().to_owned(),
                                suggestions: Vec::new(),
                            });
                        };
                        (owner, entity, warning)
                    }
                }
            }
            None => match most_recent_goal(&projects) {
                Some((owner, goal)) => (owner, goal, None),
                None => {
                    return Err(CommandError::Validation(
                        "there is no active goal to attach that task to".to_owned(),
                    ))
                }
            },
        };

        let project_id = owner.id.clone();
        let goal_id = goal.id.clone();
        let goal_label = goal.name.clone();

        if let Some(existing) =
            goal.tasks.iter().find(|task| task.is_active() && task.name_matches(&task_name))
        {
            let count = goal.active_tasks().count();
            let context =
                self.snapshot(&existing.name, today, Some(&project_id), Some(count), None);
            return Ok(ExecutionOutcome {
                reply: with_warning(
                    format!(
                        "Task '{}' already exists under '{goal_label}'; nothing new created.",
                        existing.name
                    ),
                    warning,
                ),
                subject: Some((EntityType::Task, ActionKind::Created)),
                context: Some(context),
            });
        }

        let order = goal.tasks.len() as u32 + 1;
        let count_after = goal.active_tasks().count() + 1;
        let task = Task::new(task_name, order);
        let subject_name = task.name.clone();
        self.store.add_task(&project_id, &goal_id, task).await.map_err(persist)?;

        let context =
            self.snapshot(&subject_name, today, Some(&project_id), Some(count_after), None);
        Ok(ExecutionOutcome {
            reply: with_warning(
                format!("Added task '{subject_name}' under '{goal_label}'."),
                warning,
            ),
            subject: Some((EntityType::Task, ActionKind::Created)),
            context: Some(context),
        })
    }

    async fn prioritize_task(
        &self,
        task_name: String,
        priority: Priority,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (owner, resolution) = resolve_task(&task_name, &projects);
        let (mut task, warning) = match gate(resolution, EntityType::Task, &task_name)? {
            Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
            Gated::Apply { entity, warning } => (entity.clone(), warning),
        };
        let Some((project, goal)) = owner else {
            return Err(CommandError::NotFound {
                kind: EntityType::Task,
                name: task_name.trim().to_owned(),
                suggestions: Vec::new(),
            });
        };

        task.priority = priority;
        let project_id = project.id.clone();
        let goal_id = goal.id.clone();
        let subject_name = task.name.clone();
        let count = goal.active_tasks().count();
        self.store.update_task(&project_id, &goal_id, task).await.map_err(persist)?;

        let context =
            self.snapshot(&subject_name, today, Some(&project_id), Some(count), None);
        Ok(ExecutionOutcome {
            reply: with_warning(
                format!("Set task '{}' to {} priority.", subject_name, priority.display()),
                warning,
            ),
            subject: Some((EntityType::Task, ActionKind::Prioritized)),
            context: Some(context),
        })
    }

    async fn create_milestone(
        &self,
        milestone_name: String,
        project_name: Option<String>,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (project, warning) = match project_name {
            Some(query) => {
                let resolution = resolve(&query, EntityType::Project, projects.iter());
                match gate(resolution, EntityType::Project, &query)? {
                    Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
                    Gated::Apply { entity, warning } => (entity, warning),
                }
            }
            None => match most_recent_project(&projects) {
                Some(project) => (project, None),
                None => {
                    return Err(CommandError::Validation(
                        "there is no active project to attach that milestone to".to_owned(),
                    ))
                }
            },
        };

        let project_id = project.id.clone();
        let project_label = project.name.clone();

        if let Some(existing) = project
            .milestones
            .iter()
            .find(|milestone| milestone.is_active() && milestone.name_matches(&milestone_name))
        {
            let mut updated = existing.clone();
            if due_date.is_some() {
                updated.due_date = due_date;
            }
            let nearest_due = updated.due_date;
            let subject_name = updated.name.clone();
            self.store.update_milestone(&project_id, updated).await.map_err(persist)?;

            let context =
                self.snapshot(&subject_name, today, Some(&project_id), None, nearest_due);
            return Ok(ExecutionOutcome {
                reply: with_warning(
                    format!(
                        "Milestone '{subject_name}' already exists in '{project_label}'; refreshed it."
                    ),
                    warning,
                ),
                subject: Some((EntityType::Milestone, ActionKind::Updated)),
                context: Some(context),
            });
        }

        let order = project.milestones.len() as u32 + 1;
        let milestone = Milestone::new(milestone_name, due_date, order);
        let subject_name = milestone.name.clone();
        let nearest_due = milestone.due_date;
        self.store.add_milestone(&project_id, milestone).await.map_err(persist)?;

        let context = self.snapshot(&subject_name, today, Some(&project_id), None, nearest_due);
        Ok(ExecutionOutcome {
            reply: with_warning(
                format!("Added milestone '{subject_name}' to '{project_label}'."),
                warning,
            ),
            subject: Some((EntityType::Milestone, ActionKind::Created)),
            context: Some(context),
        })
    }

    async fn complete_milestone(
        &self,
        milestone_name: String,
        today: NaiveDate,
    ) -> Result<ExecutionOutcome, CommandError> {
        let projects = self.store.projects();
        let (owner, resolution) = find_milestone(&milestone_name, &projects);
        let (mut milestone, warning) =
            match gate(resolution, EntityType::Milestone, &milestone_name)? {
                Gated::Halt(prompt) => return Ok(ExecutionOutcome::halted(prompt)),
                Gated::Apply { entity, warning } => (entity.clone(), warning),
            };
        let Some(owner) = owner else {
            return Err(CommandError::NotFound {
                kind: EntityType::Milestone,
                name: milestone_name.trim().to_owned(),
                suggestions: Vec::new(),
            });
        };

        milestone.status = EntityStatus::Completed;
        let project_id = owner.id.clone();
        let subject_name = milestone.name.clone();
        self.store.update_milestone(&project_id, milestone).await.map_err(persist)?;

        let context = self.snapshot(&subject_name, today, Some(&project_id), None, None);
        Ok(ExecutionOutcome {
            reply: with_warning(format!("Marked milestone '{subject_name}' complete."), warning),
            subject: Some((EntityType::Milestone, ActionKind::Completed)),
            context: Some(context),
        })
    }
}

fn most_recent_project(projects: &[Project]) -> Option<&Project> {
    projects
        .iter()
        .filter(|project| project.is_active())
        .max_by_key(|project| (project.updated_at, project.created_at))
}

fn most_recent_goal<'a>(projects: &'a [Project]) -> Option<(&'a Project, &'a Goal)> {
    projects
        .iter()
        .filter(|project| project.is_active())
        .flat_map(|project| project.active_goals().map(move |goal| (project, goal)))
        .max_by_key(|(_, goal)| (goal.updated_at, goal.created_at))
}

fn find_milestone<'a>(
    query: &str,
    projects: &'a [Project],
) -> (Option<&'a Project>, Resolution<'a, Milestone>) {
    for project in projects.iter().filter(|project| project.is_active()) {
        let resolution = resolve(query, EntityType::Milestone, project.milestones.iter());
        if resolution.applied_entity().is_some() {
            return (Some(project), resolution);
        }
    }

    let all = projects
        .iter()
        .filter(|project| project.is_active())
        .flat_map(|project| project.milestones.iter());
    (None, resolve(query, EntityType::Milestone, all))
}
