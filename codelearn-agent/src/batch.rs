//! Batch runner - analyzes several files one after another

use crate::orchestrator::{AnalysisEvent, AnalysisReport, Orchestrator};
use codelearn_core::{
    AnalysisRequest, DocumentSink, Error, Result, SourceReader, TextGenerator, VersionControl,
};
use futures_core::Stream;
use serde::Serialize;
use tracing::{info, warn};

/// What to do when one file's analysis fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch and surface the error
    #[default]
    Abort,
    /// Report the failure and move on to the next file
    Continue,
}

/// Totals reported when a batch ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Locations of saved documents, in input order
    pub locations: Vec<String>,
}

#[derive(Debug)]
pub enum BatchEvent {
    /// About to analyze `path` (1-based `index`)
    Processing { index: usize, total: usize, path: String },
    Progress { path: String, message: String },
    Completed { path: String, report: AnalysisReport },
    /// Only emitted under `FailurePolicy::Continue`
    Failed { path: String, error: Error },
    /// Always the last element of a batch that was not aborted
    Finished(BatchSummary),
}

impl std::fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing { index, total, path } => {
                write!(f, "Processing file {}/{}: {}", index, total, path)
            }
            Self::Progress { message, .. } => f.write_str(message),
            Self::Completed { path, report } => {
                write!(f, "Finished {} -> {}", path, report.location)
            }
            Self::Failed { path, error } => write!(f, "Failed {}: {}", path, error),
            Self::Finished(summary) => {
                write!(f, "Completed analysis of {} files", summary.total)?;
                if summary.failed > 0 {
                    write!(f, " ({} failed)", summary.failed)?;
                }
                Ok(())
            }
        }
    }
}

/// Runs the orchestrator once per path, strictly in input order
pub struct BatchRunner<R, V, G, S>
where
    R: SourceReader,
    V: VersionControl,
    G: TextGenerator,
    S: DocumentSink,
{
    orchestrator: Orchestrator<R, V, G, S>,
    policy: FailurePolicy,
}

impl<R, V, G, S> BatchRunner<R, V, G, S>
where
    R: SourceReader,
    V: VersionControl,
    G: TextGenerator,
    S: DocumentSink,
{
    pub fn new(orchestrator: Orchestrator<R, V, G, S>) -> Self {
        Self {
            orchestrator,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn orchestrator(&self) -> &Orchestrator<R, V, G, S> {
        &self.orchestrator
    }

    /// Analyze every path with the same task description
    pub fn analyze_many(
        &self,
        paths: Vec<String>,
        task: &str,
    ) -> impl Stream<Item = Result<BatchEvent>> + '_ {
        let task = task.to_string();
        async_stream::try_stream! {
            use futures_util::StreamExt;

            let total = paths.len();
            let mut summary = BatchSummary {
                total,
                ..BatchSummary::default()
            };
            info!(files = total, policy = ?self.policy, "starting batch");

            for (i, path) in paths.into_iter().enumerate() {
                yield BatchEvent::Processing { index: i + 1, total, path: path.clone() };

                let request = AnalysisRequest::new(path.clone()).with_task(task.clone());
                let events = self.orchestrator.analyze(request);
                futures_util::pin_mut!(events);

                let mut failure: Option<Error> = None;
                while let Some(event) = events.next().await {
                    match event {
                        Ok(AnalysisEvent::Progress(message)) => {
                            yield BatchEvent::Progress { path: path.clone(), message };
                        }
                        Ok(AnalysisEvent::Completed(report)) => {
                            summary.succeeded += 1;
                            summary.locations.push(report.location.clone());
                            yield BatchEvent::Completed { path: path.clone(), report };
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }

                if let Some(err) = failure {
                    match self.policy {
                        FailurePolicy::Abort => {
                            warn!(path = %path, error = %err, "aborting batch");
                            Err::<(), Error>(err.with_context("batch_path", path.clone()))?;
                        }
                        FailurePolicy::Continue => {
                            warn!(path = %path, error = %err, "file failed, continuing");
                            summary.failed += 1;
                            yield BatchEvent::Failed { path: path.clone(), error: err };
                        }
                    }
                }
            }

            info!(succeeded = summary.succeeded, failed = summary.failed, "batch finished");
            yield BatchEvent::Finished(summary);
        }
    }
}
