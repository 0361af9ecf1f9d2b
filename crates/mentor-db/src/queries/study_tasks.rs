//! Database query functions for the `study_tasks` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{StudyTask, TaskPriority};

/// Column values for a new `study_tasks` row.
#[derive(Debug, Clone)]
pub struct NewStudyTask<'a> {
    pub plan_id: Uuid,
    pub position: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: TaskPriority,
    pub week: Option<i32>,
    pub estimated_hours: Option<i32>,
}

/// Insert a new task row. Accepts a pool or an open transaction.
pub async fn insert_study_task<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewStudyTask<'_>,
) -> Result<StudyTask> {
    let task = sqlx::query_as::<_, StudyTask>(
        "INSERT INTO study_tasks \
         (plan_id, position, title, description, priority, week, estimated_hours) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(new.plan_id)
    .bind(new.position)
    .bind(new.title)
    .bind(new.description)
    .bind(new.priority)
    .bind(new.week)
    .bind(new.estimated_hours)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert study task {:?}", new.title))?;

    Ok(task)
}

/// List all tasks for a plan in plan order.
pub async fn list_tasks_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<StudyTask>> {
    let tasks = sqlx::query_as::<_, StudyTask>(
        "SELECT * FROM study_tasks WHERE plan_id = $1 ORDER BY position",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list study tasks")?;

    Ok(tasks)
}
