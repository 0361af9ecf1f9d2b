//! Plan service layer.
//!
//! Persists a generated plan as one `study_plans` row plus one `study_tasks`
//! row per scheduled task, inside a single database transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use mentor_db::models::{StudyPlan, StudyTask};
use mentor_db::queries::study_plans::{self as plan_queries, NewStudyPlan};
use mentor_db::queries::study_tasks::{self as task_queries, NewStudyTask};

use super::request::GenerateStudyPlanRequest;
use super::types::NormalizedStudyPlan;

/// Durable storage for generated plans.
///
/// The pipeline treats persistence as best-effort: an `Err` here is logged
/// and the plan is still served.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Store `plan` for `user_id`, returning the new plan id.
    async fn persist_plan(
        &self,
        user_id: Uuid,
        request: &GenerateStudyPlanRequest,
        plan: &NormalizedStudyPlan,
    ) -> Result<Uuid>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

/// [`PlanStore`] over the Postgres pool.
#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn persist_plan(
        &self,
        user_id: Uuid,
        request: &GenerateStudyPlanRequest,
        plan: &NormalizedStudyPlan,
    ) -> Result<Uuid> {
        let saved = create_study_plan(&self.pool, user_id, request, plan).await?;
        Ok(saved.id)
    }
}

/// Insert an AI-generated plan and its tasks.
///
/// The plan row stores `plan_title` as the title, `overview` as the
/// description, the request's subject and level, the summed task hours as
/// `estimated_duration`, and the full plan document in `plan_data`. Tasks
/// are numbered in schedule order. If any insert fails the transaction is
/// rolled back.
pub async fn create_study_plan(
    pool: &PgPool,
    user_id: Uuid,
    request: &GenerateStudyPlanRequest,
    plan: &NormalizedStudyPlan,
) -> Result<StudyPlan> {
    let plan_data = serde_json::to_value(plan).context("failed to serialize plan document")?;
    let difficulty = request.current_level.to_string();
    let estimated_duration =
        i32::try_from(plan.total_estimated_hours()).unwrap_or(i32::MAX);

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let saved = plan_queries::insert_study_plan(
        &mut *tx,
        &NewStudyPlan {
            user_id,
            title: &plan.plan_title,
            description: Some(&plan.overview),
            subject: Some(request.subject.trim()),
            difficulty_level: Some(&difficulty),
            estimated_duration: Some(estimated_duration),
            is_ai_generated: true,
            plan_data: Some(&plan_data),
        },
    )
    .await?;

    for (position, (week, task)) in plan.tasks().enumerate() {
        let position = i32::try_from(position).context("plan has too many tasks")?;
        task_queries::insert_study_task(
            &mut *tx,
            &NewStudyTask {
                plan_id: saved.id,
                position,
                title: &task.title,
                description: Some(&task.description),
                priority: task.priority,
                week: i32::try_from(week).ok(),
                estimated_hours: i32::try_from(task.estimated_hours).ok(),
            },
        )
        .await?;
    }

    tx.commit().await.context("failed to commit transaction")?;

    Ok(saved)
}

/// Fetch a plan and its tasks, scoped to the owning user.
///
/// Returns `None` when the plan does not exist or belongs to someone else.
pub async fn get_plan_with_tasks(
    pool: &PgPool,
    plan_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(StudyPlan, Vec<StudyTask>)>> {
    let Some(plan) = plan_queries::get_study_plan_for_user(pool, plan_id, user_id).await? else {
        return Ok(None);
    };

    let tasks = task_queries::list_tasks_for_plan(pool, plan_id).await?;

    Ok(Some((plan, tasks)))
}
