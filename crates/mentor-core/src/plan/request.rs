//! Inbound study-plan requests and their validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_TEXT_LEN: usize = 100;
pub const MAX_LEARNING_GOALS: usize = 10;
pub const MIN_HOURS_PER_WEEK: u32 = 1;
pub const MAX_HOURS_PER_WEEK: u32 = 40;

// ---------------------------------------------------------------------------
// CurrentLevel
// ---------------------------------------------------------------------------

/// The learner's self-reported level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for CurrentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

impl FromStr for CurrentLevel {
    type Err = CurrentLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(CurrentLevelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`CurrentLevel`] string.
#[derive(Debug, Clone)]
pub struct CurrentLevelParseError(pub String);

impl fmt::Display for CurrentLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid level: {:?} (expected beginner, intermediate, or advanced)",
            self.0
        )
    }
}

impl std::error::Error for CurrentLevelParseError {}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request to generate a personalized study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateStudyPlanRequest {
    pub subject: String,
    pub time_frame: String,
    pub learning_goals: Vec<String>,
    pub current_level: CurrentLevel,
    pub study_hours_per_week: u32,
}

/// One or more request fields were out of range. All problems are reported
/// together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid study plan request: {}", .problems.join("; "))]
pub struct RequestError {
    pub problems: Vec<String>,
}

impl GenerateStudyPlanRequest {
    /// Check field ranges before any model call is made.
    pub fn validate(&self) -> Result<(), RequestError> {
        let mut problems = Vec::new();

        check_text(&mut problems, "subject", &self.subject);
        check_text(&mut problems, "time_frame", &self.time_frame);

        if self.learning_goals.is_empty() || self.learning_goals.len() > MAX_LEARNING_GOALS {
            problems.push(format!(
                "learning_goals must contain between 1 and {MAX_LEARNING_GOALS} entries (got {})",
                self.learning_goals.len()
            ));
        }
        for (i, goal) in self.learning_goals.iter().enumerate() {
            if goal.trim().is_empty() {
                problems.push(format!("learning_goals[{i}] must not be blank"));
            }
        }

        if !(MIN_HOURS_PER_WEEK..=MAX_HOURS_PER_WEEK).contains(&self.study_hours_per_week) {
            problems.push(format!(
                "study_hours_per_week must be between {MIN_HOURS_PER_WEEK} and \
                 {MAX_HOURS_PER_WEEK} (got {})",
                self.study_hours_per_week
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RequestError { problems })
        }
    }
}

fn check_text(problems: &mut Vec<String>, field: &str, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        problems.push(format!("{field} must not be blank"));
    } else if trimmed.chars().count() > MAX_TEXT_LEN {
        problems.push(format!("{field} must be at most {MAX_TEXT_LEN} characters"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GenerateStudyPlanRequest {
        GenerateStudyPlanRequest {
            subject: "Python".into(),
            time_frame: "4 weeks".into(),
            learning_goals: vec!["Write scripts".into()],
            current_level: CurrentLevel::Beginner,
            study_hours_per_week: 5,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn hours_bounds_are_inclusive() {
        let mut req = valid();
        req.study_hours_per_week = 1;
        assert!(req.validate().is_ok());
        req.study_hours_per_week = 40;
        assert!(req.validate().is_ok());
        req.study_hours_per_week = 41;
        assert!(req.validate().is_err());
        req.study_hours_per_week = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn all_problems_are_reported() {
        let req = GenerateStudyPlanRequest {
            subject: "   ".into(),
            time_frame: "x".repeat(101),
            learning_goals: vec![],
            current_level: CurrentLevel::Advanced,
            study_hours_per_week: 0,
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.problems.len(), 4, "{err}");
        assert!(err.to_string().contains("subject must not be blank"));
    }

    #[test]
    fn too_many_and_blank_goals() {
        let mut req = valid();
        req.learning_goals = vec!["goal".into(); 11];
        assert!(req.validate().is_err());

        req.learning_goals = vec!["ok".into(), " ".into()];
        let err = req.validate().unwrap_err();
        assert_eq!(err.problems, vec!["learning_goals[1] must not be blank"]);
    }

    #[test]
    fn level_deserializes_lowercase_only() {
        let req: GenerateStudyPlanRequest = serde_json::from_value(serde_json::json!({
            "subject": "Rust",
            "time_frame": "2 months",
            "learning_goals": ["ownership"],
            "current_level": "intermediate",
            "study_hours_per_week": 10,
        }))
        .unwrap();
        assert_eq!(req.current_level, CurrentLevel::Intermediate);
        assert!("Expert".parse::<CurrentLevel>().is_err());
    }
}
