//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use codelearn_agent::specialist::system_prompt;
use codelearn_agent::Orchestrator;
use codelearn_core::{
    DiffOptions, DocumentSink, Error, LearningDocument, MemorySink, Result, RetryPolicy,
    SectionKind, SourceFile, SourceReader, TextGenerator, VersionControl,
};
use futures_util::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of every collaborator call
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

pub struct MapReader {
    files: HashMap<String, String>,
    log: CallLog,
}

impl MapReader {
    pub fn new(log: CallLog, files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            log,
        }
    }
}

impl SourceReader for MapReader {
    async fn read(&self, path: &str) -> Result<SourceFile> {
        self.log.push(format!("read:{}", path));
        match self.files.get(path) {
            Some(content) => Ok(SourceFile::new(path, content.clone())),
            None => Err(Error::file_not_found(path).with_operation("source::read")),
        }
    }
}

pub struct FakeVcs {
    log: CallLog,
    output: String,
    fail: bool,
}

impl FakeVcs {
    pub fn new(log: CallLog, output: &str) -> Self {
        Self {
            log,
            output: output.to_string(),
            fail: false,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            log,
            output: String::new(),
            fail: true,
        }
    }
}

impl VersionControl for FakeVcs {
    async fn diff(&self, path: &str, options: &DiffOptions) -> Result<String> {
        self.log
            .push(format!("diff:{}:history={}", path, options.include_history));
        if self.fail {
            return Err(Error::external_tool("git", "not a git repository"));
        }
        Ok(self.output.clone())
    }
}

/// How the fake generator misbehaves
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Transient failure for the first `n` calls
    Transient(usize),
    /// Permanent failure on the given specialist
    Permanent(SectionKind),
    /// Never answers
    Hang,
}

pub struct RecordingGenerator {
    log: CallLog,
    fault: Fault,
    calls: AtomicUsize,
    inputs: Mutex<Vec<(SectionKind, String)>>,
}

impl RecordingGenerator {
    pub fn new(log: CallLog) -> Self {
        Self::with_fault(log, Fault::None)
    }

    pub fn with_fault(log: CallLog, fault: Fault) -> Self {
        Self {
            log,
            fault,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<(SectionKind, String)> {
        self.inputs.lock().unwrap().clone()
    }
}

fn kind_for(prompt: &str) -> SectionKind {
    SectionKind::ALL
        .into_iter()
        .find(|k| system_prompt(*k) == prompt)
        .expect("unknown system prompt")
}

impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str, input: &str) -> Result<String> {
        let kind = kind_for(prompt);
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("generate:{}", kind));
        self.inputs.lock().unwrap().push((kind, input.to_string()));

        match self.fault {
            Fault::Transient(limit) if n < limit => Err(Error::external_service("503 overloaded")),
            Fault::Permanent(target) if target == kind => {
                Err(Error::external_service("401 unauthorized").permanent())
            }
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
            _ => Ok(format!("{} notes", kind)),
        }
    }
}

/// Sink that always fails
pub struct BrokenSink;

impl DocumentSink for BrokenSink {
    async fn save(&self, _document: &LearningDocument) -> Result<String> {
        Err(Error::persistence_failed("disk full"))
    }
}

/// Sink whose first save lands but answers only after `delay`
pub struct SlowSink {
    pub saves: AtomicUsize,
    delay: Duration,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            saves: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DocumentSink for SlowSink {
    async fn save(&self, _document: &LearningDocument) -> Result<String> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 1 {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("doc://{}", n))
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(5)).with_backoff(Duration::ZERO)
}

pub type TestOrchestrator = Orchestrator<MapReader, FakeVcs, RecordingGenerator, MemorySink>;

pub fn orchestrator(log: &CallLog, files: &[(&str, &str)]) -> TestOrchestrator {
    Orchestrator::new(
        MapReader::new(log.clone(), files),
        FakeVcs::new(log.clone(), "+print(2)\n"),
        RecordingGenerator::new(log.clone()),
        MemorySink::new(),
    )
    .with_retry(fast_retry())
}

pub async fn collect<S: Stream>(stream: S) -> Vec<S::Item> {
    stream.collect().await
}
