//! Study-plan generation pipeline.
//!
//! Raw model text flows through [`plan::extract`], [`plan::parser`] (with a
//! single repair round-trip), [`plan::normalize`] and [`plan::validate`]
//! before being persisted and cached by [`pipeline::StudyPlanPipeline`].

pub mod cache;
pub mod llm;
pub mod pipeline;
pub mod plan;
pub mod token;
