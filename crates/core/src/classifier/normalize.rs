use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::domain::{EntityStatus, Priority};

/// Maps loose status synonyms onto the closed status set. Unrecognized
/// input falls back to `Planned`.
pub fn normalize_status(raw: &str) -> EntityStatus {
    let lowered = raw.trim().to_ascii_lowercase();
    if matches!(lowered.as_str(), "done" | "complete" | "completed" | "finished") {
        EntityStatus::Completed
    } else if lowered.contains("progress")
        || matches!(lowered.as_str(), "active" | "ongoing" | "started" | "underway")
    {
        EntityStatus::InProgress
    } else {
        EntityStatus::Planned
    }
}

pub fn normalize_priority(raw: &str) -> Priority {
    let lowered = raw.trim().trim_end_matches(" priority").to_ascii_lowercase();
    match lowered.as_str() {
        "high" | "urgent" | "critical" | "top" => Priority::High,
        "low" | "minor" | "later" => Priority::Low,
        _ => Priority::Medium,
    }
}

pub fn looks_like_priority(raw: &str) -> bool {
    matches!(
        raw.trim().trim_end_matches(" priority").to_ascii_lowercase().as_str(),
        "high" | "urgent" | "critical" | "top" | "medium" | "normal" | "low" | "minor" | "later"
    )
}

/// Resolves a free-text date against today's date. Returns `None` on
/// anything unparseable; date failures never abort classification.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    normalize_date_from(Utc::now().date_naive(), raw)
}

pub fn normalize_date_from(today: NaiveDate, raw: &str) -> Option<NaiveDate> {
    let lowered = raw.trim().trim_end_matches(['.', '!']).to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }

    match lowered.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "next week" => return Some(today + Duration::days(7)),
        "next month" => return Some(today + Duration::days(30)),
        "end of week" | "end of the week" => return Some(next_weekday(today, Weekday::Sun)),
        _ => {}
    }

    let weekday_text = lowered.strip_prefix("next ").unwrap_or(&lowered);
    if let Ok(weekday) = weekday_text.parse::<Weekday>() {
        return Some(next_weekday(today, weekday));
    }

    let cleaned = lowered.replace(',', " ");
    let normalized = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%B %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date);
        }
    }
    None
}

/// First occurrence of `weekday` strictly after `today`.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    today + Duration::days(ahead)
}

/// Splits a focus-area phrase on commas and "and", dropping empties.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .flat_map(|segment| segment.split(" and "))
        .map(|part| part.trim().trim_matches(['\'', '"']).to_owned())
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        looks_like_priority, normalize_date_from, normalize_priority, normalize_status, split_list,
    };
    use crate::domain::{EntityStatus, Priority};

    fn wednesday() -> NaiveDate {
        // 2026-08-26 is a Wednesday.
        NaiveDate::from_ymd_opt(2026, 8, 26).expect("valid date")
    }

    #[test]
    fn status_synonyms_collapse_to_closed_set() {
        assert_eq!(normalize_status("done"), EntityStatus::Completed);
        assert_eq!(normalize_status("Completed"), EntityStatus::Completed);
        assert_eq!(normalize_status("in progress"), EntityStatus::InProgress);
        assert_eq!(normalize_status("ongoing"), EntityStatus::InProgress);
        assert_eq!(normalize_status("someday"), EntityStatus::Planned);
    }

    #[test]
    fn priority_synonyms_collapse_with_medium_default() {
        assert_eq!(normalize_priority("urgent"), Priority::High);
        assert_eq!(normalize_priority("high priority"), Priority::High);
        assert_eq!(normalize_priority("minor"), Priority::Low);
        assert_eq!(normalize_priority("whenever"), Priority::Medium);
        assert!(looks_like_priority("High"));
        assert!(!looks_like_priority("done"));
    }

    #[test]
    fn relative_dates_resolve_against_reference_day() {
        let today = wednesday();
        assert_eq!(normalize_date_from(today, "today"), Some(today));
        assert_eq!(
            normalize_date_from(today, "tomorrow"),
            NaiveDate::from_ymd_opt(2026, 8, 27)
        );
        assert_eq!(
            normalize_date_from(today, "next week"),
            NaiveDate::from_ymd_opt(2026, 9, 2)
        );
        // Next Friday is two days out; "next wednesday" skips a full week.
        assert_eq!(
            normalize_date_from(today, "friday"),
            NaiveDate::from_ymd_opt(2026, 8, 28)
        );
        assert_eq!(
            normalize_date_from(today, "next wednesday"),
            NaiveDate::from_ymd_opt(2026, 9, 2)
        );
    }

    #[test]
    fn absolute_dates_parse_in_common_formats() {
        let today = wednesday();
        let expected = NaiveDate::from_ymd_opt(2026, 12, 1);
        assert_eq!(normalize_date_from(today, "2026-12-01"), expected);
        assert_eq!(normalize_date_from(today, "12/01/2026"), expected);
        assert_eq!(normalize_date_from(today, "December 1, 2026"), expected);
    }

    #[test]
    fn unparseable_dates_return_none_without_failing() {
        let today = wednesday();
        assert_eq!(normalize_date_from(today, "whenever it suits"), None);
        assert_eq!(normalize_date_from(today, ""), None);
    }

    #[test]
    fn list_splitting_handles_commas_and_conjunctions() {
        assert_eq!(
            split_list("health, career and 'deep work'"),
            vec!["health".to_owned(), "career".to_owned(), "deep work".to_owned()]
        );
        assert!(split_list(" , and ").is_empty());
    }
}
