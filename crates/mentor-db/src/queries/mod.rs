pub mod study_plans;
pub mod study_tasks;
