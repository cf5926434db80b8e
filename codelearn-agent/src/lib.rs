//! # codelearn agent
//!
//! Turns a source file into a learning document:
//! 1. The request selects a workflow plan (standard or git-first)
//! 2. The orchestrator reads the file, and fetches its diff when asked
//! 3. Each specialist gets the full file and writes one section
//! 4. The assembled document is persisted once, at the end
//!
//! Every step reports progress through a lazy stream; the batch runner
//! chains several analyses one file at a time.

mod batch;
mod orchestrator;
pub mod specialist;
pub mod talk;

pub use batch::{BatchEvent, BatchRunner, BatchSummary, FailurePolicy};
pub use orchestrator::{AnalysisEvent, AnalysisReport, Orchestrator};
pub use specialist::{compose_input, SpecialistDispatcher};
pub use talk::{TalkIdeas, DEFAULT_TOPIC};
