//! Integration tests for persisting generated plans to Postgres.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use mentor_core::plan::{
    CurrentLevel, GenerateStudyPlanRequest, PgPlanStore, PlanStore, get_plan_with_tasks,
    normalize_plan, validate_plan,
};
use mentor_core::plan::types::NormalizedStudyPlan;
use mentor_db::models::{PlanStatus, TaskPriority, TaskStatus};
use mentor_test_utils::{create_test_db, drop_test_db};

fn request() -> GenerateStudyPlanRequest {
    GenerateStudyPlanRequest {
        subject: " Rust ".into(),
        time_frame: "3 weeks".into(),
        learning_goals: vec!["Ownership".into()],
        current_level: CurrentLevel::Intermediate,
        study_hours_per_week: 6,
    }
}

fn plan() -> NormalizedStudyPlan {
    let draft = json!({
        "plan_title": "Rust Ownership",
        "overview": "Borrowing without tears.",
        "weekly_schedule": [
            {"week": 1, "focus": "Moves", "tasks": [
                {"title": "Read chapter 4", "estimated_hours": 2, "priority": "high"},
                {"title": "Exercises", "estimated_hours": 3}
            ]},
            {"week": 2, "focus": "Lifetimes", "tasks": [
                {"title": "Lifetime puzzles", "estimated_hours": 4, "priority": "low"}
            ]}
        ]
    });
    validate_plan(normalize_plan(&draft), Utc::now(), 0, None)
        .expect("draft should validate")
        .plan
}

#[tokio::test]
async fn persist_plan_writes_plan_and_tasks() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());
    let user_id = Uuid::new_v4();

    let plan_id = store
        .persist_plan(user_id, &request(), &plan())
        .await
        .expect("persist should succeed");

    let (row, tasks) = get_plan_with_tasks(&pool, plan_id, user_id)
        .await
        .unwrap()
        .expect("plan should exist");

    assert_eq!(row.title, "Rust Ownership");
    assert_eq!(row.description.as_deref(), Some("Borrowing without tears."));
    assert_eq!(row.subject.as_deref(), Some("Rust"));
    assert_eq!(row.difficulty_level.as_deref(), Some("intermediate"));
    assert_eq!(row.estimated_duration, Some(9));
    assert!(row.is_ai_generated);
    assert_eq!(row.status, PlanStatus::Ongoing);
    let stored: NormalizedStudyPlan =
        serde_json::from_value(row.plan_data.clone().unwrap()).unwrap();
    assert_eq!(stored, plan());

    let summary: Vec<(i32, &str, Option<i32>, TaskPriority)> = tasks
        .iter()
        .map(|t| (t.position, t.title.as_str(), t.week, t.priority))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, "Read chapter 4", Some(1), TaskPriority::High),
            (1, "Exercises", Some(1), TaskPriority::Medium),
            (2, "Lifetime puzzles", Some(2), TaskPriority::Low),
        ]
    );
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn plans_are_private_to_their_owner() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());
    let owner = Uuid::new_v4();

    let plan_id = store.persist_plan(owner, &request(), &plan()).await.unwrap();

    let stranger = get_plan_with_tasks(&pool, plan_id, Uuid::new_v4())
        .await
        .unwrap();
    assert!(stranger.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn persist_fails_cleanly_when_database_is_gone() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());
    pool.close().await;

    let result = store.persist_plan(Uuid::new_v4(), &request(), &plan()).await;
    assert!(result.is_err());

    drop_test_db(&db_name).await;
}
