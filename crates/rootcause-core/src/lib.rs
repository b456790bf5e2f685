//! Core types and the trigger engine for root-cause report triage.
//!
//! Failure signals from sub-agents, quality gates, test suites, pipelines and
//! humans arrive as [`trigger::TriggerEvent`]s. The engine derives evidence,
//! confidence, severity and urgency from each event and either folds it into
//! the matching active [`report::RootCauseReport`] or opens a new one.
//!
//! This crate has no database or CLI dependencies.
//! Storage backends implement [`store::ReportRepository`].

// Trait methods spell out `+ Send` futures; impls use plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod analysis;
pub mod confidence;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod gate;
pub mod memory;
pub mod report;
pub mod severity;
pub mod signature;
pub mod store;
pub mod tier;
pub mod trigger;

pub use engine::{SubmitResult, TriggerEngine};
pub use error::{Error, Result};
