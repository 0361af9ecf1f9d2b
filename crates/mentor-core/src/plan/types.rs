//! Typed shape of a validated study plan.
//!
//! Values of these types only come out of [`super::validate::validate_plan`],
//! so every field is present and correctly typed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mentor_db::models::TaskPriority;

/// The canonical plan document produced by the model and normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedStudyPlan {
    pub plan_title: String,
    pub overview: String,
    pub learning_objectives: Vec<String>,
    pub weekly_schedule: Vec<WeekEntry>,
    pub milestones: Vec<Milestone>,
    pub resources: Vec<String>,
    pub tips: Vec<String>,
}

impl NormalizedStudyPlan {
    /// Iterate over every task in schedule order, paired with its week.
    pub fn tasks(&self) -> impl Iterator<Item = (i64, &TaskEntry)> {
        self.weekly_schedule
            .iter()
            .flat_map(|w| w.tasks.iter().map(move |t| (w.week, t)))
    }

    /// Sum of `estimated_hours` across all tasks.
    pub fn total_estimated_hours(&self) -> i64 {
        self.tasks()
            .map(|(_, t)| t.estimated_hours)
            .fold(0i64, i64::saturating_add)
    }
}

/// One week of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekEntry {
    pub week: i64,
    pub focus: String,
    pub tasks: Vec<TaskEntry>,
}

/// A single study task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub title: String,
    pub description: String,
    /// Never negative.
    pub estimated_hours: i64,
    pub priority: TaskPriority,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub week: i64,
    pub milestone: String,
    pub assessment: String,
}

/// A validated plan plus the metadata attached when it is served.
///
/// `generated_at` is stamped per response and is never cached; a cache hit
/// gets a fresh timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedStudyPlan {
    #[serde(flatten)]
    pub plan: NormalizedStudyPlan,
    pub generated_at: DateTime<Utc>,
    pub tokens_used: i64,
    pub saved_plan_id: Option<Uuid>,
}
