//! Orchestrator - runs one analysis request through its workflow plan

use crate::specialist::{compose_input, specialist_name, SpecialistDispatcher};
use codelearn_core::{
    AnalysisRequest, DiffOptions, DocumentSink, Error, LearningDocument, Result, RetryPolicy,
    SourceFile, SourceReader, Step, TextGenerator, VersionControl, WorkflowPlan,
};
use futures_core::Stream;
use serde::Serialize;
use tracing::{debug, info};

/// Result of a finished analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub document: LearningDocument,
    /// Where the sink stored the document
    pub location: String,
}

/// One element of an analysis stream. `Completed` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    Progress(String),
    Completed(AnalysisReport),
}

impl AnalysisEvent {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl std::fmt::Display for AnalysisEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Progress(message) => f.write_str(message),
            Self::Completed(report) => write!(f, "Documentation saved to {}", report.location),
        }
    }
}

/// Wires the four collaborators together
pub struct Orchestrator<R, V, G, S>
where
    R: SourceReader,
    V: VersionControl,
    G: TextGenerator,
    S: DocumentSink,
{
    reader: R,
    vcs: V,
    dispatcher: SpecialistDispatcher<G>,
    sink: S,
    retry: RetryPolicy,
    diff_options: DiffOptions,
}

impl<R, V, G, S> Orchestrator<R, V, G, S>
where
    R: SourceReader,
    V: VersionControl,
    G: TextGenerator,
    S: DocumentSink,
{
    pub fn new(reader: R, vcs: V, generator: G, sink: S) -> Self {
        Self {
            reader,
            vcs,
            dispatcher: SpecialistDispatcher::new(generator),
            sink,
            retry: RetryPolicy::default(),
            diff_options: DiffOptions::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base diff options; `include_history` is taken from each request
    pub fn with_diff_options(mut self, options: DiffOptions) -> Self {
        self.diff_options = options;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn generator(&self) -> &G {
        self.dispatcher.generator()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run `request` and narrate progress.
    ///
    /// Steps execute strictly in plan order with one external call in flight
    /// at a time. Any error ends the stream; the document is only persisted
    /// once every specialist has succeeded.
    pub fn analyze(&self, request: AnalysisRequest) -> impl Stream<Item = Result<AnalysisEvent>> + '_ {
        async_stream::try_stream! {
            let plan = WorkflowPlan::for_request(&request);
            let path = request.file_path.as_str();
            info!(path, workflow = %plan.kind(), "starting analysis");

            yield AnalysisEvent::Progress(format!("Starting code analysis of {}", path));
            yield AnalysisEvent::Progress(format!("Using {}", plan.kind().description()));
            debug!(instructions = plan.instructions(), "workflow instructions");

            let mut source: Option<SourceFile> = None;
            let mut diff: Option<String> = None;
            let mut document: Option<LearningDocument> = None;

            for step in plan.steps() {
                match *step {
                    Step::ReadSource => {
                        yield AnalysisEvent::Progress(format!("Reading {}", path));
                        let file = self
                            .retry
                            .run("source::read", || self.reader.read(path))
                            .await?;
                        debug!(path, lines = file.lines, language = %file.language, "source loaded");
                        document = Some(LearningDocument::new(file.file_name.clone()));
                        source = Some(file);
                    }
                    Step::FetchDiff => {
                        yield AnalysisEvent::Progress(format!("Fetching diff for {}", path));
                        let options = self
                            .diff_options
                            .clone()
                            .with_history(request.include_history);
                        let text = self
                            .retry
                            .run("vcs::diff", || self.vcs.diff(path, &options))
                            .await?;
                        diff = Some(text);
                    }
                    Step::Specialist(kind) => {
                        let file = source.as_ref().ok_or_else(|| missing_source(*step))?;
                        yield AnalysisEvent::Progress(format!(
                            "Asking the {} about {}",
                            specialist_name(kind),
                            file.file_name
                        ));
                        let input = compose_input(kind, file, &request.task_description, diff.as_deref());
                        let output = self
                            .retry
                            .run("specialist::dispatch", || self.dispatcher.dispatch(kind, &input))
                            .await?;
                        document
                            .as_mut()
                            .ok_or_else(|| missing_source(*step))?
                            .add(output);
                    }
                    Step::Persist => {
                        let doc = document.take().ok_or_else(|| missing_source(*step))?;
                        yield AnalysisEvent::Progress("Saving learning document".to_string());
                        // a save that timed out may still have landed
                        let location = self
                            .retry
                            .single_attempt()
                            .run("storage::save", || self.sink.save(&doc))
                            .await?;
                        info!(path, location = %location, sections = doc.sections().len(), "analysis complete");
                        yield AnalysisEvent::Completed(AnalysisReport { document: doc, location });
                    }
                }
            }
        }
    }

    /// Drive `analyze` to completion, discarding progress
    pub async fn analyze_to_report(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        use futures_util::StreamExt;

        let events = self.analyze(request);
        futures_util::pin_mut!(events);
        while let Some(event) = events.next().await {
            if let AnalysisEvent::Completed(report) = event? {
                return Ok(report);
            }
        }
        Err(Error::unexpected("analysis ended without a document").with_operation("orchestrator::analyze"))
    }
}

fn missing_source(step: Step) -> Error {
    Error::unexpected(format!("step '{}' ran before the source was read", step))
        .with_operation("orchestrator::analyze")
}
