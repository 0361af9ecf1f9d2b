//! Database query functions for the `study_plans` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{PlanStatus, StudyPlan};

/// Column values for a new `study_plans` row.
#[derive(Debug, Clone)]
pub struct NewStudyPlan<'a> {
    pub user_id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub difficulty_level: Option<&'a str>,
    pub estimated_duration: Option<i32>,
    pub is_ai_generated: bool,
    pub plan_data: Option<&'a serde_json::Value>,
}

/// Insert a new plan row. Returns the inserted plan with server-generated
/// defaults (id, status, timestamps). Accepts a pool or an open transaction.
pub async fn insert_study_plan<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewStudyPlan<'_>,
) -> Result<StudyPlan> {
    let plan = sqlx::query_as::<_, StudyPlan>(
        "INSERT INTO study_plans \
         (user_id, title, description, subject, difficulty_level, estimated_duration, is_ai_generated, plan_data) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.title)
    .bind(new.description)
    .bind(new.subject)
    .bind(new.difficulty_level)
    .bind(new.estimated_duration)
    .bind(new.is_ai_generated)
    .bind(new.plan_data)
    .fetch_one(executor)
    .await
    .context("failed to insert study plan")?;

    Ok(plan)
}

/// Fetch a plan by ID, scoped to its owner.
///
/// Returns `None` both when the plan does not exist and when it belongs to a
/// different user.
pub async fn get_study_plan_for_user(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<StudyPlan>> {
    let plan =
        sqlx::query_as::<_, StudyPlan>("SELECT * FROM study_plans WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch study plan")?;

    Ok(plan)
}

/// Which slice of a user's plans to list.
#[derive(Debug, Clone, Copy)]
pub struct PlanListFilter {
    pub status: Option<PlanStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PlanListFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// List a user's plans, newest first, optionally restricted to one status.
pub async fn list_study_plans_for_user(
    pool: &PgPool,
    user_id: Uuid,
    filter: &PlanListFilter,
) -> Result<Vec<StudyPlan>> {
    let plans = sqlx::query_as::<_, StudyPlan>(
        "SELECT * FROM study_plans \
         WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(filter.status)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
    .context("failed to list study plans")?;

    Ok(plans)
}
