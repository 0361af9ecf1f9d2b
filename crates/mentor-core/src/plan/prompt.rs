//! Prompt construction for plan generation and JSON repair.
//!
//! Pure string building; no I/O.

use super::request::GenerateStudyPlanRequest;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Output contract included in the system prompt.
const PLAN_FORMAT_REFERENCE: &str = r#"## Output Format

Respond with a single JSON object and nothing else:

```json
{
  "plan_title": "string",
  "overview": "string",
  "learning_objectives": ["string"],
  "weekly_schedule": [
    {
      "week": 1,
      "focus": "string",
      "tasks": [
        {
          "title": "string",
          "description": "string",
          "estimated_hours": 2,
          "priority": "low | medium | high",
          "resources": ["string"]
        }
      ]
    }
  ],
  "milestones": [
    {"week": 2, "milestone": "string", "assessment": "string"}
  ],
  "resources": ["string"],
  "tips": ["string"]
}
```

- `estimated_hours` is a whole number of hours.
- `priority` is exactly one of `low`, `medium`, `high`.
- Do not wrap the JSON in prose. Do not add comments.
"#;

/// Build the system prompt for plan generation.
pub fn build_system_prompt() -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str("# Study Plan Designer\n\n");
    prompt.push_str(
        "You are an AI education assistant specialized in creating personalized \
         study plans. Create detailed, structured plans that are practical and \
         achievable within the learner's weekly time budget.\n\n",
    );
    prompt.push_str(PLAN_FORMAT_REFERENCE);
    prompt
}

/// Build the user prompt describing the learner's request.
pub fn build_user_prompt(request: &GenerateStudyPlanRequest) -> String {
    let mut prompt = String::with_capacity(512);
    prompt.push_str("Create a study plan for:\n");
    prompt.push_str(&format!("- Subject: {}\n", request.subject.trim()));
    prompt.push_str(&format!("- Current level: {}\n", request.current_level));
    prompt.push_str(&format!("- Time frame: {}\n", request.time_frame.trim()));
    prompt.push_str(&format!(
        "- Study hours per week: {}\n",
        request.study_hours_per_week
    ));
    prompt.push_str("- Learning goals:\n");
    for goal in &request.learning_goals {
        prompt.push_str(&format!("  - {}\n", goal.trim()));
    }
    prompt.push_str(
        "\nSplit the time frame into weeks. Keep the total estimated hours of each \
         week within the weekly budget, and end with milestones the learner can \
         check themselves against.\n",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// System prompt for the one-shot JSON repair call.
pub const REPAIR_SYSTEM_PROMPT: &str = "You repair malformed JSON. Return only the corrected \
     JSON object, conforming to the provided schema. Keep the original content; do not \
     invent new fields.";

/// Build the repair prompt around the malformed text.
pub fn build_repair_prompt(malformed: &str) -> String {
    format!(
        "The following text was supposed to be a JSON study plan but could not be parsed.\n\
         Fix it and return valid JSON only.\n\n\
         ---\n{malformed}\n---\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::request::CurrentLevel;

    fn request() -> GenerateStudyPlanRequest {
        GenerateStudyPlanRequest {
            subject: "  Python ".into(),
            time_frame: "4 weeks".into(),
            learning_goals: vec!["Write scripts".into(), "Use pandas".into()],
            current_level: CurrentLevel::Beginner,
            study_hours_per_week: 5,
        }
    }

    #[test]
    fn system_prompt_describes_every_field() {
        let prompt = build_system_prompt();
        for field in [
            "plan_title",
            "overview",
            "learning_objectives",
            "weekly_schedule",
            "milestones",
            "resources",
            "tips",
        ] {
            assert!(prompt.contains(field), "missing {field}");
        }
    }

    #[test]
    fn user_prompt_includes_request() {
        let prompt = build_user_prompt(&request());
        assert!(prompt.contains("- Subject: Python\n"));
        assert!(prompt.contains("- Current level: beginner"));
        assert!(prompt.contains("- Study hours per week: 5"));
        assert!(prompt.contains("  - Use pandas\n"));
    }

    #[test]
    fn repair_prompt_embeds_text() {
        let prompt = build_repair_prompt("{\"plan_title\": ");
        assert!(prompt.contains("---\n{\"plan_title\": \n---"));
    }
}
