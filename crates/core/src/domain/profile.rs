use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user settings mutated by the growth-tracker and focus-area commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub focus_areas: Vec<String>,
    pub growth_metrics: Vec<GrowthMetric>,
    pub updated_at: DateTime<Utc>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self { focus_areas: Vec::new(), growth_metrics: Vec::new(), updated_at: Utc::now() }
    }
}

impl UserProfile {
    /// Upserts a metric by case-insensitive name.
    pub fn record_metric(&mut self, name: &str, value: f64) {
        let trimmed = name.trim();
        match self
            .growth_metrics
            .iter_mut()
            .find(|metric| metric.name.eq_ignore_ascii_case(trimmed))
        {
            Some(metric) => {
                metric.value = value;
                metric.recorded_at = Utc::now();
            }
            None => self.growth_metrics.push(GrowthMetric {
                name: trimmed.to_owned(),
                value,
                recorded_at: Utc::now(),
            }),
        }
        self.updated_at = Utc::now();
    }

    pub fn set_focus_areas(&mut self, areas: Vec<String>) {
        self.focus_areas = areas;
        self.updated_at = Utc::now();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetric {
    pub name: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::UserProfile;

    #[test]
    fn record_metric_upserts_by_case_insensitive_name() {
        let mut profile = UserProfile::default();
        profile.record_metric("weekly revenue", 120.0);
        profile.record_metric("Weekly Revenue", 150.0);

        assert_eq!(profile.growth_metrics.len(), 1);
        assert_eq!(profile.growth_metrics[0].value, 150.0);
    }

    #[test]
    fn set_focus_areas_replaces_previous_list() {
        let mut profile = UserProfile::default();
        profile.set_focus_areas(vec!["health".to_owned(), "career".to_owned()]);
        profile.set_focus_areas(vec!["writing".to_owned()]);
        assert_eq!(profile.focus_areas, vec!["writing".to_owned()]);
    }
}
