//! seedorder engine - seeding business logic
//!
//! This crate implements:
//! - Change detection against the active-seed registry
//! - The transactional clear-then-reload orchestrator
//! - The [`Seeder`] service: ordering, scoping, partial seeding and
//!   seed file management

pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod seeder;

pub use error::SeedError;
pub use gate::{ChangeGate, GateDecision};
pub use orchestrator::{Orchestrator, RunSummary, SeedPlan};
pub use seeder::{CandidateFile, FileBinding, SeedOutcome, Seeder, TableFiles, TableScope};
