//! Cache keys for generated plans.
//!
//! Two requests that differ only in case or whitespace share a fingerprint,
//! so they share a cached plan.

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::request::{CurrentLevel, GenerateStudyPlanRequest};

#[derive(Serialize)]
struct FingerprintInput<'a> {
    user_id: &'a Uuid,
    subject: String,
    time_frame: String,
    learning_goals: Vec<String>,
    current_level: CurrentLevel,
    study_hours_per_week: u32,
}

fn canonical(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 (hex) of the user id and the normalized request.
pub fn fingerprint(user_id: Uuid, request: &GenerateStudyPlanRequest) -> String {
    let input = FingerprintInput {
        user_id: &user_id,
        subject: canonical(&request.subject),
        time_frame: canonical(&request.time_frame),
        learning_goals: request.learning_goals.iter().map(|g| canonical(g)).collect(),
        current_level: request.current_level,
        study_hours_per_week: request.study_hours_per_week,
    };
    // Serializing a struct of strings and integers cannot fail.
    let bytes = serde_json::to_vec(&input).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Cache key for a user's request: `study_plan:<user_id>:<fingerprint>`.
pub fn cache_key(user_id: Uuid, request: &GenerateStudyPlanRequest) -> String {
    format!("study_plan:{user_id}:{}", fingerprint(user_id, request))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateStudyPlanRequest {
        GenerateStudyPlanRequest {
            subject: "Python".into(),
            time_frame: "4 weeks".into(),
            learning_goals: vec!["Write scripts".into()],
            current_level: CurrentLevel::Beginner,
            study_hours_per_week: 5,
        }
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = fingerprint(Uuid::nil(), &request());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn case_and_whitespace_do_not_matter() {
        let user = Uuid::new_v4();
        let mut other = request();
        other.subject = "  PYTHON ".into();
        other.time_frame = "4   Weeks".into();
        other.learning_goals = vec!["write SCRIPTS".into()];
        assert_eq!(fingerprint(user, &request()), fingerprint(user, &other));
    }

    #[test]
    fn users_and_parameters_are_distinguished() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(fingerprint(a, &request()), fingerprint(b, &request()));

        let mut harder = request();
        harder.current_level = CurrentLevel::Advanced;
        assert_ne!(fingerprint(a, &request()), fingerprint(a, &harder));

        let mut more_hours = request();
        more_hours.study_hours_per_week = 6;
        assert_ne!(fingerprint(a, &request()), fingerprint(a, &more_hours));
    }

    #[test]
    fn goal_order_matters() {
        let user = Uuid::new_v4();
        let mut a = request();
        a.learning_goals = vec!["one".into(), "two".into()];
        let mut b = request();
        b.learning_goals = vec!["two".into(), "one".into()];
        assert_ne!(fingerprint(user, &a), fingerprint(user, &b));
    }

    #[test]
    fn cache_key_has_prefix() {
        let user = Uuid::nil();
        let key = cache_key(user, &request());
        assert!(key.starts_with(&format!("study_plan:{user}:")));
    }
}
