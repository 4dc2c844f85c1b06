//! Ordered pattern classification of free-form chat text.
//!
//! Command families are tried in a fixed priority order; within a family,
//! patterns are tried top to bottom and the first extractor that produces
//! a command wins. A text that matches nothing is not an error; it is
//! forwarded to the remote conversational delegate instead.

mod normalize;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::{EntityStatus, Priority};

pub use normalize::{
    looks_like_priority, normalize_date, normalize_date_from, normalize_priority,
    normalize_status, split_list,
};

/// One variant per supported intent, carrying typed fields only.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedCommand {
    DeleteProject {
        project_name: String,
    },
    CreateProject {
        name: String,
        description: Option<String>,
    },
    UpdateProject {
        project_name: String,
        status: Option<EntityStatus>,
        priority: Option<Priority>,
    },
    UpdateGrowthTracker {
        metric: String,
        value: f64,
    },
    UpdateFocusAreas {
        areas: Vec<String>,
    },
    CreateGoal {
        goal_title: String,
        project_name: Option<String>,
        target_date: Option<NaiveDate>,
    },
    UpdateGoal {
        goal_title: String,
        status: Option<EntityStatus>,
        target_date: Option<NaiveDate>,
    },
    CreateTask {
        task_name: String,
        goal_title: Option<String>,
    },
    PrioritizeTask {
        task_name: String,
        priority: Priority,
    },
    CreateMilestone {
        milestone_name: String,
        project_name: Option<String>,
        due_date: Option<NaiveDate>,
    },
    CompleteMilestone {
        milestone_name: String,
    },
}

struct PatternEntry {
    pattern: Regex,
    extract: fn(&Captures) -> Option<ParsedCommand>,
}

struct PatternFamily {
    name: &'static str,
    entries: Vec<PatternEntry>,
}

/// Classify raw text. `None` means "no command here", never a failure.
pub fn classify(text: &str) -> Option<ParsedCommand> {
    classify_with_family(text).map(|(_, command)| command)
}

/// Like [`classify`], additionally naming the matched family for logging.
pub fn classify_with_family(text: &str) -> Option<(&'static str, ParsedCommand)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    for family in FAMILIES.iter() {
        for entry in &family.entries {
            if let Some(captures) = entry.pattern.captures(trimmed) {
                if let Some(command) = (entry.extract)(&captures) {
                    return Some((family.name, command));
                }
            }
        }
    }
    None
}

fn entry(pattern: &str, extract: fn(&Captures) -> Option<ParsedCommand>) -> PatternEntry {
    PatternEntry {
        pattern: Regex::new(pattern).expect("command pattern must compile"),
        extract,
    }
}

fn capture(captures: &Captures, index: usize) -> Option<String> {
    captures
        .get(index)
        .map(|group| group.as_str().trim().trim_matches(['\'', '"']).trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Families in priority order: delete > project create/update >
/// growth-tracker > focus-areas > goal > task > milestone.
static FAMILIES: Lazy<Vec<PatternFamily>> = Lazy::new(|| {
    vec![
        PatternFamily {
            name: "project-delete",
            entries: vec![entry(
                r#"(?i)^(?:delete|remove|drop)\s+(?:the\s+)?project\s+(?:named\s+|called\s+)?['"]?([^'"]+?)['"]?\s*$"#,
                |captures| {
                    Some(ParsedCommand::DeleteProject { project_name: capture(captures, 1)? })
                },
            )],
        },
        PatternFamily {
            name: "project",
            entries: vec![
                entry(
                    r#"(?i)^(?:create|add|start)\s+(?:a\s+)?(?:new\s+)?project\s+(?:named\s+|called\s+)?['"]([^'"]+)['"](?:\s+(?:for|about)\s+(.+?))?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateProject {
                            name: capture(captures, 1)?,
                            description: capture(captures, 2),
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:create|add|start)\s+(?:a\s+)?(?:new\s+)?project\s+(?:named\s+|called\s+)?(.+?)\s*$"#,
                    |captures| {
                        let tail = capture(captures, 1)?;
                        let (name, description) = match tail.split_once(" for ") {
                            Some((name, rest)) => (name.trim().to_owned(), Some(rest.trim().to_owned())),
                            None => (tail, None),
                        };
                        Some(ParsedCommand::CreateProject { name, description })
                    },
                ),
                entry(
                    r#"(?i)^(?:mark|set|update|move)\s+(?:the\s+)?project\s+['"]?([^'"]+?)['"]?\s+(?:as|to)\s+(.+?)\s*$"#,
                    |captures| {
                        let project_name = capture(captures, 1)?;
                        let value = capture(captures, 2)?;
                        if looks_like_priority(&value) {
                            Some(ParsedCommand::UpdateProject {
                                project_name,
                                status: None,
                                priority: Some(normalize_priority(&value)),
                            })
                        } else {
                            Some(ParsedCommand::UpdateProject {
                                project_name,
                                status: Some(normalize_status(&value)),
                                priority: None,
                            })
                        }
                    },
                ),
            ],
        },
        PatternFamily {
            name: "growth-tracker",
            entries: vec![
                entry(
                    r"(?i)^(?:update|set)\s+(?:my\s+)?growth(?:\s+tracker)?[:,]?\s+(?:set\s+)?(.+?)\s+(?:to|=)\s+([0-9]+(?:\.[0-9]+)?)\s*$",
                    |captures| {
                        Some(ParsedCommand::UpdateGrowthTracker {
                            metric: capture(captures, 1)?,
                            value: capture(captures, 2)?.parse().ok()?,
                        })
                    },
                ),
                entry(
                    r"(?i)^(?:log|record)\s+([0-9]+(?:\.[0-9]+)?)\s+(?:for|against)\s+(?:my\s+)?(.+?)\s*$",
                    |captures| {
                        Some(ParsedCommand::UpdateGrowthTracker {
                            metric: capture(captures, 2)?,
                            value: capture(captures, 1)?.parse().ok()?,
                        })
                    },
                ),
            ],
        },
        PatternFamily {
            name: "focus-areas",
            entries: vec![
                entry(
                    r"(?i)^(?:set|update|change)\s+(?:my\s+)?focus\s+areas?\s+(?:to|:)\s*(.+?)\s*$",
                    |captures| {
                        Some(ParsedCommand::UpdateFocusAreas {
                            areas: split_list(&capture(captures, 1)?),
                        })
                    },
                ),
                entry(r"(?i)^focus\s+on\s+(.+?)\s*$", |captures| {
                    Some(ParsedCommand::UpdateFocusAreas {
                        areas: split_list(&capture(captures, 1)?),
                    })
                }),
            ],
        },
        PatternFamily {
            name: "goal",
            entries: vec![
                entry(
                    r#"(?i)^(?:add|create)\s+(?:a\s+)?(?:new\s+)?goal\s+['"]([^'"]+)['"]\s+(?:to|for|under|in)\s+(?:the\s+)?(?:project\s+)?['"]?([^'"]+?)['"]?(?:\s+by\s+([^'"]+?))?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateGoal {
                            goal_title: capture(captures, 1)?,
                            project_name: capture(captures, 2),
                            target_date: capture(captures, 3)
                                .and_then(|raw| normalize_date(&raw)),
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:add|create)\s+(?:a\s+)?(?:new\s+)?goal\s+['"]([^'"]+)['"](?:\s+by\s+(.+?))?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateGoal {
                            goal_title: capture(captures, 1)?,
                            project_name: None,
                            target_date: capture(captures, 2)
                                .and_then(|raw| normalize_date(&raw)),
                        })
                    },
                ),
                entry(
                    r"(?i)^(?:add|create)\s+(?:a\s+)?goal\s+(.+?)\s+(?:to|for)\s+(?:the\s+)?project\s+(.+?)\s*$",
                    |captures| {
                        Some(ParsedCommand::CreateGoal {
                            goal_title: capture(captures, 1)?,
                            project_name: capture(captures, 2),
                            target_date: None,
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:set|move|push)\s+(?:the\s+)?goal\s+['"]?([^'"]+?)['"]?\s+(?:deadline|due(?:\s+date)?|target(?:\s+date)?)\s+to\s+(.+?)\s*$"#,
                    |captures| {
                        Some(ParsedCommand::UpdateGoal {
                            goal_title: capture(captures, 1)?,
                            status: None,
                            target_date: capture(captures, 2)
                                .and_then(|raw| normalize_date(&raw)),
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:mark|set|update)\s+(?:the\s+)?goal\s+['"]?([^'"]+?)['"]?\s+(?:as|to)\s+(.+?)\s*$"#,
                    |captures| {
                        Some(ParsedCommand::UpdateGoal {
                            goal_title: capture(captures, 1)?,
                            status: Some(normalize_status(&capture(captures, 2)?)),
                            target_date: None,
                        })
                    },
                ),
            ],
        },
        PatternFamily {
            name: "task",
            entries: vec![
                entry(
                    r#"(?i)^(?:add|create)\s+(?:a\s+)?(?:new\s+)?task\s+['"]([^'"]+)['"]\s+(?:to|for|under|in)\s+(?:the\s+)?(?:goal\s+)?['"]?([^'"]+?)['"]?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateTask {
                            task_name: capture(captures, 1)?,
                            goal_title: capture(captures, 2),
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:add|create)\s+(?:a\s+)?(?:new\s+)?task\s+['"]([^'"]+)['"]\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateTask {
                            task_name: capture(captures, 1)?,
                            goal_title: None,
                        })
                    },
                ),
                entry(
                    r#"(?i)^prioritize\s+(?:the\s+)?task\s+['"]?([^'"]+?)['"]?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::PrioritizeTask {
                            task_name: capture(captures, 1)?,
                            priority: Priority::High,
                        })
                    },
                ),
                entry(
                    r#"(?i)^deprioritize\s+(?:the\s+)?task\s+['"]?([^'"]+?)['"]?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::PrioritizeTask {
                            task_name: capture(captures, 1)?,
                            priority: Priority::Low,
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:set|make)\s+(?:the\s+)?task\s+['"]?([^'"]+?)['"]?\s+(?:priority\s+to|to|priority)\s+(\w+)(?:\s+priority)?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::PrioritizeTask {
                            task_name: capture(captures, 1)?,
                            priority: normalize_priority(&capture(captures, 2)?),
                        })
                    },
                ),
            ],
        },
        PatternFamily {
            name: "milestone",
            entries: vec![
                entry(
                    r#"(?i)^(?:add|create)\s+(?:a\s+)?(?:new\s+)?milestone\s+['"]([^'"]+)['"](?:\s+(?:to|for|under|in)\s+(?:the\s+)?(?:project\s+)?['"]?([^'"]+?)['"]?)?(?:\s+(?:by|due)\s+([^'"]+?))?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CreateMilestone {
                            milestone_name: capture(captures, 1)?,
                            project_name: capture(captures, 2),
                            due_date: capture(captures, 3).and_then(|raw| normalize_date(&raw)),
                        })
                    },
                ),
                entry(
                    r#"(?i)^(?:complete|finish)\s+(?:the\s+)?milestone\s+['"]?([^'"]+?)['"]?\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CompleteMilestone {
                            milestone_name: capture(captures, 1)?,
                        })
                    },
                ),
                entry(
                    r#"(?i)^mark\s+(?:the\s+)?milestone\s+['"]?([^'"]+?)['"]?\s+(?:as\s+)?(?:done|complete|completed)\s*$"#,
                    |captures| {
                        Some(ParsedCommand::CompleteMilestone {
                            milestone_name: capture(captures, 1)?,
                        })
                    },
                ),
            ],
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::{classify, ParsedCommand};
    use crate::domain::{EntityStatus, Priority};

    #[test]
    fn create_project_with_quoted_name_and_description() {
        let command = classify("create project 'Launch' for Q1 marketing");
        assert_eq!(
            command,
            Some(ParsedCommand::CreateProject {
                name: "Launch".to_owned(),
                description: Some("Q1 marketing".to_owned()),
            })
        );
    }

    #[test]
    fn create_project_without_quotes_splits_description() {
        let command = classify("start a new project Rebrand for the fall push");
        assert_eq!(
            command,
            Some(ParsedCommand::CreateProject {
                name: "Rebrand".to_owned(),
                description: Some("the fall push".to_owned()),
            })
        );
    }

    #[test]
    fn delete_family_wins_over_other_project_patterns() {
        let command = classify("remove the project 'Old Site'");
        assert_eq!(
            command,
            Some(ParsedCommand::DeleteProject { project_name: "Old Site".to_owned() })
        );
    }

    #[test]
    fn project_update_distinguishes_status_from_priority() {
        assert_eq!(
            classify("mark the project 'Launch' as done"),
            Some(ParsedCommand::UpdateProject {
                project_name: "Launch".to_owned(),
                status: Some(EntityStatus::Completed),
                priority: None,
            })
        );
        assert_eq!(
            classify("set project 'Launch' to high priority"),
            Some(ParsedCommand::UpdateProject {
                project_name: "Launch".to_owned(),
                status: None,
                priority: Some(Priority::High),
            })
        );
    }

    #[test]
    fn growth_tracker_parses_metric_and_numeric_value() {
        assert_eq!(
            classify("update my growth tracker: set deep work hours to 12.5"),
            Some(ParsedCommand::UpdateGrowthTracker {
                metric: "deep work hours".to_owned(),
                value: 12.5,
            })
        );
        assert_eq!(
            classify("log 3 for morning pages"),
            Some(ParsedCommand::UpdateGrowthTracker {
                metric: "morning pages".to_owned(),
                value: 3.0,
            })
        );
    }

    #[test]
    fn focus_areas_split_on_commas_and_and() {
        assert_eq!(
            classify("set my focus areas to health, career and writing"),
            Some(ParsedCommand::UpdateFocusAreas {
                areas: vec!["health".to_owned(), "career".to_owned(), "writing".to_owned()],
            })
        );
    }

    #[test]
    fn goal_creation_captures_project_qualifier_and_date() {
        let command = classify("add a goal 'MVP' to Launch");
        assert_eq!(
            command,
            Some(ParsedCommand::CreateGoal {
                goal_title: "MVP".to_owned(),
                project_name: Some("Launch".to_owned()),
                target_date: None,
            })
        );

        match classify("add a goal 'MVP' to Launch by tomorrow") {
            Some(ParsedCommand::CreateGoal { goal_title, project_name, target_date }) => {
                assert_eq!(goal_title, "MVP");
                assert_eq!(project_name.as_deref(), Some("Launch"));
                assert!(target_date.is_some());
            }
            other => panic!("expected goal creation, got {other:?}"),
        }
    }

    #[test]
    fn goal_creation_without_qualifier_has_no_project() {
        assert_eq!(
            classify("create a goal 'Read 12 books'"),
            Some(ParsedCommand::CreateGoal {
                goal_title: "Read 12 books".to_owned(),
                project_name: None,
                target_date: None,
            })
        );
    }

    #[test]
    fn goal_deadline_update_takes_precedence_over_status_update() {
        match classify("set the goal 'MVP' deadline to next week") {
            Some(ParsedCommand::UpdateGoal { goal_title, status, target_date }) => {
                assert_eq!(goal_title, "MVP");
                assert_eq!(status, None);
                assert!(target_date.is_some());
            }
            other => panic!("expected goal update, got {other:?}"),
        }
    }

    #[test]
    fn task_patterns_cover_create_and_priority_changes() {
        assert_eq!(
            classify("add a task 'draft outline' to 'MVP'"),
            Some(ParsedCommand::CreateTask {
                task_name: "draft outline".to_owned(),
                goal_title: Some("MVP".to_owned()),
            })
        );
        assert_eq!(
            classify("prioritize the task 'draft outline'"),
            Some(ParsedCommand::PrioritizeTask {
                task_name: "draft outline".to_owned(),
                priority: Priority::High,
            })
        );
        assert_eq!(
            classify("set task 'draft outline' to low"),
            Some(ParsedCommand::PrioritizeTask {
                task_name: "draft outline".to_owned(),
                priority: Priority::Low,
            })
        );
    }

    #[test]
    fn milestone_patterns_cover_create_and_complete() {
        match classify("add a milestone 'Beta' to Launch by next week") {
            Some(ParsedCommand::CreateMilestone { milestone_name, project_name, due_date }) => {
                assert_eq!(milestone_name, "Beta");
                assert_eq!(project_name.as_deref(), Some("Launch"));
                assert!(due_date.is_some());
            }
            other => panic!("expected milestone creation, got {other:?}"),
        }
        assert_eq!(
            classify("complete the milestone 'Beta'"),
            Some(ParsedCommand::CompleteMilestone { milestone_name: "Beta".to_owned() })
        );
        assert_eq!(
            classify("mark milestone 'Beta' as done"),
            Some(ParsedCommand::CompleteMilestone { milestone_name: "Beta".to_owned() })
        );
    }

    #[test]
    fn unmatched_text_returns_none_not_an_error() {
        assert_eq!(classify("what should I work on this week?"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
    }

    #[test]
    fn classifier_never_panics_on_malformed_matching_text() {
        // Shapes that hit a family but carry junk fields.
        for text in [
            "create project ''",
            "add a goal '' to Launch",
            "set task '' to low",
            "update my growth tracker: set hours to 99999999999999999999",
            "delete project '\u{1F680}'",
        ] {
            let _ = classify(text);
        }
    }
}
