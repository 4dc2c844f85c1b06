//! Graded fuzzy resolution of free-text names against candidate pools.
//!
//! Tiers are evaluated in order and the first satisfied tier terminates
//! resolution: active filter, exact case-insensitive match, bidirectional
//! substring match, single-candidate fallback suggestion, not-found.

use chrono::{DateTime, Utc};

use crate::domain::goal::{Goal, Task};
use crate::domain::project::{Milestone, Project};
use crate::domain::EntityType;

/// Candidates a pool can resolve. Recency fields break ties between
/// multiple exact matches.
pub trait Resolvable {
    fn display_name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn updated_at(&self) -> DateTime<Utc>;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Resolvable for Project {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.is_active()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Resolvable for Goal {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.is_active()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Resolvable for Task {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.is_active()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Resolvable for Milestone {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.is_active()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Graded resolution outcome. Only the first three variants permit the
/// caller to proceed to mutation; `SuggestedFallback` requires explicit
/// user confirmation first.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<'a, T> {
    Resolved(&'a T),
    AmbiguousResolved { entity: &'a T, match_count: usize },
    FuzzyResolved(&'a T),
    SuggestedFallback { candidate: &'a T, prompt: String },
    NotFound { suggestions: Vec<String> },
    NoCandidates,
}

impl<'a, T> Resolution<'a, T> {
    /// The entity this resolution would auto-apply to, if any.
    pub fn applied_entity(&self) -> Option<&'a T> {
        match self {
            Self::Resolved(entity)
            | Self::AmbiguousResolved { entity, .. }
            | Self::FuzzyResolved(entity) => Some(entity),
            Self::SuggestedFallback { .. } | Self::NotFound { .. } | Self::NoCandidates => None,
        }
    }
}

const MAX_NOT_FOUND_SUGGESTIONS: usize = 3;

/// Resolve `query` against any pool of candidates.
pub fn resolve<'a, T, I>(query: &str, kind: EntityType, pool: I) -> Resolution<'a, T>
where
    T: Resolvable,
    I: IntoIterator<Item = &'a T>,
{
    let active = pool.into_iter().filter(|candidate| candidate.is_active()).collect::<Vec<_>>();
    if active.is_empty() {
        return Resolution::NoCandidates;
    }

    let needle = query.trim().to_lowercase();

    let mut exact = active
        .iter()
        .copied()
        .filter(|candidate| candidate.display_name().to_lowercase() == needle)
        .collect::<Vec<_>>();
    if !exact.is_empty() {
        let match_count = exact.len();
        // Most recently updated wins; created_at breaks remaining ties.
        exact.sort_by(|left, right| {
            right
                .updated_at()
                .cmp(&left.updated_at())
                .then(right.created_at().cmp(&left.created_at()))
        });
        let entity = exact[0];
        return if match_count == 1 {
            Resolution::Resolved(entity)
        } else {
            Resolution::AmbiguousResolved { entity, match_count }
        };
    }

    let fuzzy = active
        .iter()
        .copied()
        .filter(|candidate| {
            let haystack = candidate.display_name().to_lowercase();
            haystack.contains(&needle) || needle.contains(&haystack)
        })
        .collect::<Vec<_>>();
    if fuzzy.len() == 1 {
        return Resolution::FuzzyResolved(fuzzy[0]);
    }

    if active.len() == 1 {
        let candidate = active[0];
        let prompt = format!(
            "I couldn't find a {} named '{}'. Did you mean '{}'?",
            kind.display(),
            query.trim(),
            candidate.display_name()
        );
        return Resolution::SuggestedFallback { candidate, prompt };
    }

    let source = if fuzzy.is_empty() { &active } else { &fuzzy };
    let suggestions = source
        .iter()
        .take(MAX_NOT_FOUND_SUGGESTIONS)
        .map(|candidate| candidate.display_name().to_owned())
        .collect();
    Resolution::NotFound { suggestions }
}

/// Goal lookup with scope narrowing: constrained to `project` when a
/// qualifier resolved, otherwise searched across all projects, returning
/// the first project whose active goals yield an applicable match.
pub fn resolve_goal<'a>(
    query: &str,
    project: Option<&'a Project>,
    projects: &'a [Project],
) -> (Option<&'a Project>, Resolution<'a, Goal>) {
    if let Some(project) = project {
        return (Some(project), resolve(query, EntityType::Goal, project.goals.iter()));
    }

    for candidate in projects.iter().filter(|candidate| candidate.is_active()) {
        let resolution = resolve(query, EntityType::Goal, candidate.goals.iter());
        if resolution.applied_entity().is_some() {
            return (Some(candidate), resolution);
        }
    }

    let all_goals = projects
        .iter()
        .filter(|candidate| candidate.is_active())
        .flat_map(|candidate| candidate.goals.iter());
    (None, resolve(query, EntityType::Goal, all_goals))
}

/// Global task lookup across every goal of every active project. Returns
/// the owning project and goal alongside the resolution so the caller can
/// address the mutation.
pub fn resolve_task<'a>(
    query: &str,
    projects: &'a [Project],
) -> (Option<(&'a Project, &'a Goal)>, Resolution<'a, Task>) {
    for project in projects.iter().filter(|project| project.is_active()) {
        for goal in project.active_goals() {
            let resolution = resolve(query, EntityType::Task, goal.tasks.iter());
            if resolution.applied_entity().is_some() {
                return (Some((project, goal)), resolution);
            }
        }
    }

    let all_tasks = projects
        .iter()
        .filter(|project| project.is_active())
        .flat_map(|project| project.goals.iter())
        .filter(|goal| goal.is_active())
        .flat_map(|goal| goal.tasks.iter());
    (None, resolve(query, EntityType::Task, all_tasks))
}
