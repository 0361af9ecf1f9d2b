//! Integration tests for study plan and task CRUD operations.
//!
//! Each test creates a unique temporary database on the shared test server
//! (see `mentor_test_utils`), runs migrations, and drops it on completion.

use serde_json::json;
use uuid::Uuid;

use mentor_db::models::{PlanStatus, TaskPriority, TaskStatus};
use mentor_db::pool;
use mentor_db::queries::study_plans::{self, NewStudyPlan, PlanListFilter};
use mentor_db::queries::study_tasks::{self, NewStudyTask};
use mentor_test_utils::{create_test_db, drop_test_db};

fn new_plan(user_id: Uuid, title: &str) -> NewStudyPlan<'_> {
    NewStudyPlan {
        user_id,
        title,
        description: Some("Four weeks of fundamentals"),
        subject: Some("Python"),
        difficulty_level: Some("beginner"),
        estimated_duration: Some(20),
        is_ai_generated: true,
        plan_data: None,
    }
}

// -----------------------------------------------------------------------
// Plans
// -----------------------------------------------------------------------

#[tokio::test]
async fn insert_and_get_plan() {
    let (pool, db_name) = create_test_db().await;
    let user_id = Uuid::new_v4();
    let data = json!({"plan_title": "Python Basics", "weekly_schedule": []});

    let mut new = new_plan(user_id, "Python Basics");
    new.plan_data = Some(&data);
    let plan = study_plans::insert_study_plan(&pool, &new)
        .await
        .expect("insert should succeed");

    assert_eq!(plan.title, "Python Basics");
    assert_eq!(plan.status, PlanStatus::Ongoing);
    assert!(plan.is_ai_generated);
    assert_eq!(plan.plan_data.as_ref(), Some(&data));

    let fetched = study_plans::get_study_plan_for_user(&pool, plan.id, user_id)
        .await
        .expect("get should succeed")
        .expect("plan should exist");
    assert_eq!(fetched.id, plan.id);
    assert_eq!(fetched.subject.as_deref(), Some("Python"));
    assert_eq!(fetched.estimated_duration, Some(20));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn get_plan_is_scoped_to_owner() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();

    let plan = study_plans::insert_study_plan(&pool, &new_plan(owner, "Mine"))
        .await
        .expect("insert should succeed");

    let other = study_plans::get_study_plan_for_user(&pool, plan.id, Uuid::new_v4())
        .await
        .expect("get should not error");
    assert!(other.is_none(), "another user must not see the plan");

    let missing = study_plans::get_study_plan_for_user(&pool, Uuid::new_v4(), owner)
        .await
        .expect("get should not error");
    assert!(missing.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_plans_newest_first() {
    let (pool, db_name) = create_test_db().await;
    let user_id = Uuid::new_v4();

    let first = study_plans::insert_study_plan(&pool, &new_plan(user_id, "First"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = study_plans::insert_study_plan(&pool, &new_plan(user_id, "Second"))
        .await
        .unwrap();
    study_plans::insert_study_plan(&pool, &new_plan(Uuid::new_v4(), "Someone else"))
        .await
        .unwrap();

    let plans = study_plans::list_study_plans_for_user(&pool, user_id, &PlanListFilter::default())
        .await
        .expect("list should succeed");
    let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_plans_filters_by_status() {
    let (pool, db_name) = create_test_db().await;
    let user_id = Uuid::new_v4();

    let ongoing = study_plans::insert_study_plan(&pool, &new_plan(user_id, "Ongoing"))
        .await
        .unwrap();
    let archived = study_plans::insert_study_plan(&pool, &new_plan(user_id, "Archived"))
        .await
        .unwrap();
    sqlx::query("UPDATE study_plans SET status = 'archived' WHERE id = $1")
        .bind(archived.id)
        .execute(&pool)
        .await
        .unwrap();

    let filter = PlanListFilter {
        status: Some(PlanStatus::Archived),
        ..PlanListFilter::default()
    };
    let plans = study_plans::list_study_plans_for_user(&pool, user_id, &filter)
        .await
        .unwrap();
    let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![archived.id]);

    let filter = PlanListFilter {
        status: Some(PlanStatus::Ongoing),
        ..PlanListFilter::default()
    };
    let plans = study_plans::list_study_plans_for_user(&pool, user_id, &filter)
        .await
        .unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, ongoing.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_plans_pages_newest_first() {
    let (pool, db_name) = create_test_db().await;
    let user_id = Uuid::new_v4();

    let mut ids = Vec::new();
    for title in ["a", "b", "c"] {
        let plan = study_plans::insert_study_plan(&pool, &new_plan(user_id, title))
            .await
            .unwrap();
        ids.push(plan.id);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let page = |offset| PlanListFilter {
        status: None,
        limit: 2,
        offset,
    };
    let first: Vec<Uuid> = study_plans::list_study_plans_for_user(&pool, user_id, &page(0))
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    let second: Vec<Uuid> = study_plans::list_study_plans_for_user(&pool, user_id, &page(2))
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(first, vec![ids[2], ids[1]]);
    assert_eq!(second, vec![ids[0]]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Tasks
// -----------------------------------------------------------------------

#[tokio::test]
async fn tasks_listed_in_position_order() {
    let (pool, db_name) = create_test_db().await;
    let plan = study_plans::insert_study_plan(&pool, &new_plan(Uuid::new_v4(), "Plan"))
        .await
        .unwrap();

    for (position, title, priority) in [
        (1, "Practice loops", TaskPriority::Medium),
        (0, "Install Python", TaskPriority::High),
        (2, "Read style guide", TaskPriority::Low),
    ] {
        study_tasks::insert_study_task(
            &pool,
            &NewStudyTask {
                plan_id: plan.id,
                position,
                title,
                description: None,
                priority,
                week: Some(1),
                estimated_hours: Some(2),
            },
        )
        .await
        .expect("task insert should succeed");
    }

    let tasks = study_tasks::list_tasks_for_plan(&pool, plan.id)
        .await
        .expect("list should succeed");
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Install Python", "Practice loops", "Read style guide"]
    );
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));
    assert_eq!(tasks[0].priority, TaskPriority::High);
    assert!(tasks[0].completed_at.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_task_position_is_rejected() {
    let (pool, db_name) = create_test_db().await;
    let plan = study_plans::insert_study_plan(&pool, &new_plan(Uuid::new_v4(), "Plan"))
        .await
        .unwrap();

    let task = NewStudyTask {
        plan_id: plan.id,
        position: 0,
        title: "Only one",
        description: Some("first"),
        priority: TaskPriority::default(),
        week: None,
        estimated_hours: None,
    };
    study_tasks::insert_study_task(&pool, &task).await.unwrap();
    let dup = study_tasks::insert_study_task(&pool, &task).await;
    assert!(dup.is_err(), "(plan_id, position) must be unique");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn store_summary_counts_plans_and_tasks() {
    let (pool, db_name) = create_test_db().await;

    let empty = pool::store_summary(&pool).await.expect("summary should succeed");
    assert_eq!(
        empty,
        pool::StoreSummary {
            study_plans: 0,
            ai_generated_plans: 0,
            study_tasks: 0,
        }
    );

    let user_id = Uuid::new_v4();
    let generated = study_plans::insert_study_plan(&pool, &new_plan(user_id, "Generated"))
        .await
        .unwrap();
    let mut manual = new_plan(user_id, "Manual");
    manual.is_ai_generated = false;
    study_plans::insert_study_plan(&pool, &manual).await.unwrap();
    study_tasks::insert_study_task(
        &pool,
        &NewStudyTask {
            plan_id: generated.id,
            position: 0,
            title: "Read",
            description: None,
            priority: TaskPriority::default(),
            week: Some(1),
            estimated_hours: Some(1),
        },
    )
    .await
    .unwrap();

    let summary = pool::store_summary(&pool).await.unwrap();
    assert_eq!(summary.study_plans, 2);
    assert_eq!(summary.ai_generated_plans, 1);
    assert_eq!(summary.study_tasks, 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}
