//! # codelearn core
//!
//! The collaborators a learning-document analysis talks to, and the data
//! that flows between them.
//!
//! ## Core Concepts
//! - **Source reader**: loads the file under analysis
//! - **Version control**: diff and commit history for that file
//! - **Text generator**: one system prompt + input -> text round trip
//! - **Document sink**: persists the finished document
//! - **Workflow plan**: the fixed, typed step list an analysis executes
//! - **Retry policy**: timeout and a single bounded retry around external calls
//! - **Provider**: trait-based LLM communication (OpenAI-compatible, Anthropic)

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod provider;
pub mod retry;
pub mod source;
pub mod storage;
pub mod vcs;
pub mod workflow;

pub use config::AppConfig;
pub use document::{LearningDocument, Section, SectionKind, SpecialistOutput};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use generate::{ProviderGenerator, TextGenerator};
pub use provider::{
    AnthropicProvider, AnyProvider, ChatMessage, CompletionRequest, CompletionResponse,
    FinishReason, LlmProvider, OpenAIProvider, ProviderConfig, ProviderError, ProviderType, Role,
    StreamChunk, StreamReceiver, Usage, UsageTracker,
};
pub use retry::RetryPolicy;
pub use source::{FsSourceReader, Language, SourceFile, SourceReader};
pub use storage::{DocumentSink, FileSink, MemorySink};
pub use vcs::{CommitEntry, DiffOptions, GitInspector, VersionControl};
pub use workflow::{build_workflow, AnalysisRequest, Step, WorkflowKind, WorkflowPlan};
