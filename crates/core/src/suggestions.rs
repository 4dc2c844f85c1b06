//! Proactive follow-up hints generated after a successful mutation.
//!
//! `suggest` is pure: it reads a pre-captured context snapshot and walks a
//! declarative rule table in declaration order. Generation stops as soon
//! as three suggestions are collected.

use chrono::NaiveDate;

use crate::domain::profile::UserProfile;
use crate::domain::project::Project;
use crate::domain::{ActionKind, EntityType};

pub const MAX_SUGGESTIONS: usize = 3;

/// Everything the rules may look at, captured after the mutation landed.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextSnapshot {
    pub subject_name: String,
    pub today: NaiveDate,
    pub project: Option<ProjectHealth>,
    /// Active task count of the goal the command touched, if any.
    pub goal_task_count: Option<usize>,
    /// Nearest relevant due date (goal target or milestone due).
    pub nearest_due: Option<NaiveDate>,
    pub focus_areas: Vec<String>,
    pub workload: Workload,
}

impl ContextSnapshot {
    /// Derive a snapshot from store state around the affected entities.
    pub fn capture(
        subject_name: impl Into<String>,
        today: NaiveDate,
        projects: &[Project],
        profile: &UserProfile,
        affected_project: Option<&Project>,
        goal_task_count: Option<usize>,
        nearest_due: Option<NaiveDate>,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            today,
            project: affected_project.map(ProjectHealth::of),
            goal_task_count,
            nearest_due,
            focus_areas: profile.focus_areas.clone(),
            workload: Workload::of(projects),
        }
    }

    fn deadline(&self) -> Option<DeadlineProximity> {
        self.nearest_due.map(|due| DeadlineProximity::from_days((due - self.today).num_days()))
    }
}

/// Booleans derived from child counts of the affected project.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectHealth {
    pub has_goals: bool,
    pub has_milestones: bool,
    pub has_tasks: bool,
}

impl ProjectHealth {
    pub fn of(project: &Project) -> Self {
        Self {
            has_goals: project.active_goals().next().is_some(),
            has_milestones: project.active_milestones().next().is_some(),
            has_tasks: project.active_task_count() > 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineProximity {
    Overdue,
    Urgent,
    Approaching,
    Distant,
}

impl DeadlineProximity {
    pub fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=-1 => Self::Overdue,
            0..=3 => Self::Urgent,
            4..=7 => Self::Approaching,
            _ => Self::Distant,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Workload {
    pub active_project_count: usize,
    pub total_active_tasks: usize,
}

impl Workload {
    pub fn of(projects: &[Project]) -> Self {
        let active = projects.iter().filter(|project| project.is_active());
        let (mut count, mut tasks) = (0usize, 0usize);
        for project in active {
            count += 1;
            tasks += project.active_task_count();
        }
        Self { active_project_count: count, total_active_tasks: tasks }
    }

    pub fn is_overloaded(&self) -> bool {
        self.active_project_count > 5 || self.total_active_tasks > 20
    }
}

struct SuggestionRule {
    applies_to: &'static [(EntityType, ActionKind)],
    produce: fn(&ContextSnapshot) -> Option<String>,
}

static RULES: &[SuggestionRule] = &[
    SuggestionRule {
        applies_to: &[(EntityType::Project, ActionKind::Created)],
        produce: |ctx| {
            let health = ctx.project?;
            (!health.has_goals).then(|| {
                format!("Break '{}' into 2-3 concrete goals so progress is measurable.", ctx.subject_name)
            })
        },
    },
    SuggestionRule {
        applies_to: &[(EntityType::Project, ActionKind::Created)],
        produce: |ctx| {
            let health = ctx.project?;
            (!health.has_milestones).then(|| {
                format!("Add a first milestone to '{}' to anchor its timeline.", ctx.subject_name)
            })
        },
    },
    SuggestionRule {
        applies_to: &[
            (EntityType::Project, ActionKind::Created),
            (EntityType::Project, ActionKind::Updated),
        ],
        produce: |ctx| {
            if ctx.focus_areas.is_empty() {
                return None;
            }
            let top = ctx.focus_areas.iter().take(2).cloned().collect::<Vec<_>>().join(" and ");
            Some(format!("Consider aligning '{}' with your focus on {top}.", ctx.subject_name))
        },
    },
    SuggestionRule {
        applies_to: &[(EntityType::Task, ActionKind::Created)],
        produce: |ctx| {
            let count = ctx.goal_task_count?;
            (count > 6).then(|| {
                format!(
                    "That goal now has {count} open tasks; consider splitting it into sub-goals."
                )
            })
        },
    },
    SuggestionRule {
        applies_to: &[
            (EntityType::Goal, ActionKind::Created),
            (EntityType::Goal, ActionKind::Updated),
            (EntityType::Milestone, ActionKind::Created),
        ],
        produce: |ctx| match ctx.deadline()? {
            DeadlineProximity::Overdue => {
                Some(format!("'{}' is already past its date; reschedule or descope it.", ctx.subject_name))
            }
            DeadlineProximity::Urgent => {
                Some(format!("'{}' is due within 3 days; block time for it now.", ctx.subject_name))
            }
            DeadlineProximity::Approaching => {
                Some(format!("'{}' is due within the week; line up its next step.", ctx.subject_name))
            }
            DeadlineProximity::Distant => None,
        },
    },
    SuggestionRule {
        applies_to: &[(EntityType::Goal, ActionKind::Created)],
        produce: |ctx| {
            let health = ctx.project?;
            (!health.has_tasks).then(|| {
                format!("Add the first task under '{}' to get it moving.", ctx.subject_name)
            })
        },
    },
    SuggestionRule {
        applies_to: &[(EntityType::Milestone, ActionKind::Completed)],
        produce: |ctx| {
            let health = ctx.project?;
            (!health.has_milestones)
                .then(|| "That was the last open milestone; set the next one.".to_owned())
                .or_else(|| Some(format!("'{}' is done; review what unblocked.", ctx.subject_name)))
        },
    },
    SuggestionRule {
        applies_to: &[
            (EntityType::Project, ActionKind::Created),
            (EntityType::Task, ActionKind::Created),
            (EntityType::Task, ActionKind::Prioritized),
        ],
        produce: |ctx| {
            ctx.workload.is_overloaded().then(|| {
                format!(
                    "You have {} active projects and {} open tasks; consider narrowing focus.",
                    ctx.workload.active_project_count, ctx.workload.total_active_tasks
                )
            })
        },
    },
];

/// Up to three hints for `(entity, action)`, in rule-declaration order.
pub fn suggest(entity: EntityType, action: ActionKind, ctx: &ContextSnapshot) -> Vec<String> {
    let mut collected = Vec::new();
    for rule in RULES {
        if !rule.applies_to.contains(&(entity, action)) {
            continue;
        }
        if let Some(hint) = (rule.produce)(ctx) {
            collected.push(hint);
            if collected.len() == MAX_SUGGESTIONS {
                break;
            }
        }
    }
    collected
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::{suggest, ContextSnapshot, DeadlineProximity, ProjectHealth, Workload};
    use crate::domain::goal::{Goal, Task};
    use crate::domain::profile::UserProfile;
    use crate::domain::project::Project;
    use crate::domain::{ActionKind, EntityType};

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot {
            subject_name: "Launch".to_owned(),
            today: Utc::now().date_naive(),
            project: Some(ProjectHealth { has_goals: false, has_milestones: false, has_tasks: false }),
            goal_task_count: None,
            nearest_due: None,
            focus_areas: Vec::new(),
            workload: Workload::default(),
        }
    }

    #[test]
    fn project_creation_without_children_suggests_goals_and_milestones() {
        let hints = suggest(EntityType::Project, ActionKind::Created, &snapshot());
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("goals"));
        assert!(hints[1].contains("milestone"));
    }

    #[test]
    fn focus_areas_surface_the_top_two() {
        let mut ctx = snapshot();
        ctx.focus_areas =
            vec!["health".to_owned(), "career".to_owned(), "writing".to_owned()];
        let hints = suggest(EntityType::Project, ActionKind::Created, &ctx);
        let aligned = hints.iter().find(|hint| hint.contains("focus")).expect("focus hint");
        assert!(aligned.contains("health and career"));
        assert!(!aligned.contains("writing"));
    }

    #[test]
    fn generator_never_exceeds_three_suggestions() {
        let mut ctx = snapshot();
        ctx.focus_areas = vec!["health".to_owned()];
        ctx.workload = Workload { active_project_count: 9, total_active_tasks: 40 };
        // Four rules would fire for project creation here.
        let hints = suggest(EntityType::Project, ActionKind::Created, &ctx);
        assert_eq!(hints.len(), 3);
    }

    #[test]
    fn seventh_task_triggers_split_suggestion() {
        let mut ctx = snapshot();
        ctx.goal_task_count = Some(7);
        let hints = suggest(EntityType::Task, ActionKind::Created, &ctx);
        assert!(hints.iter().any(|hint| hint.contains("sub-goals")), "{hints:?}");

        ctx.goal_task_count = Some(6);
        let hints = suggest(EntityType::Task, ActionKind::Created, &ctx);
        assert!(hints.iter().all(|hint| !hint.contains("sub-goals")));
    }

    #[test]
    fn deadline_proximity_buckets_match_day_ranges() {
        assert_eq!(DeadlineProximity::from_days(-1), DeadlineProximity::Overdue);
        assert_eq!(DeadlineProximity::from_days(0), DeadlineProximity::Urgent);
        assert_eq!(DeadlineProximity::from_days(3), DeadlineProximity::Urgent);
        assert_eq!(DeadlineProximity::from_days(4), DeadlineProximity::Approaching);
        assert_eq!(DeadlineProximity::from_days(7), DeadlineProximity::Approaching);
        assert_eq!(DeadlineProximity::from_days(8), DeadlineProximity::Distant);
    }

    #[test]
    fn urgent_goal_deadline_produces_hint() {
        let mut ctx = snapshot();
        ctx.nearest_due = Some(ctx.today + Duration::days(2));
        let hints = suggest(EntityType::Goal, ActionKind::Created, &ctx);
        assert!(hints.iter().any(|hint| hint.contains("3 days")), "{hints:?}");
    }

    #[test]
    fn workload_derives_from_active_projects_only() {
        let mut active = Project::new("Launch", 1);
        let mut goal = Goal::new("MVP", None, 1);
        goal.tasks.push(Task::new("a", 1));
        goal.tasks.push(Task::new("b", 2));
        active.goals.push(goal);
        let mut deleted = Project::new("Old", 2);
        deleted.status = crate::domain::EntityStatus::Deleted;

        let workload = Workload::of(&[active, deleted]);
        assert_eq!(workload.active_project_count, 1);
        assert_eq!(workload.total_active_tasks, 2);
        assert!(!workload.is_overloaded());
    }

    #[test]
    fn capture_reads_profile_focus_areas() {
        let mut profile = UserProfile::default();
        profile.set_focus_areas(vec!["health".to_owned()]);
        let projects = vec![Project::new("Launch", 1)];
        let ctx = ContextSnapshot::capture(
            "Launch",
            NaiveDate::from_ymd_opt(2026, 8, 26).expect("valid date"),
            &projects,
            &profile,
            Some(&projects[0]),
            None,
            None,
        );
        assert_eq!(ctx.focus_areas, vec!["health".to_owned()]);
        assert_eq!(ctx.workload.active_project_count, 1);
    }
}
