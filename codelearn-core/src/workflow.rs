//! # Workflow
//!
//! An analysis request selects one of two workflows. `build_workflow`
//! renders the human-readable instruction text; `WorkflowPlan` is the typed
//! step list the orchestrator actually executes.

use crate::document::SectionKind;
use serde::{Deserialize, Serialize};

/// One analysis invocation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub file_path: String,
    pub task_description: String,
    pub include_diff: bool,
    pub include_history: bool,
}

impl AnalysisRequest {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task_description = task.into();
        self
    }

    pub fn with_diff(mut self, include: bool) -> Self {
        self.include_diff = include;
        self
    }

    pub fn with_history(mut self, include: bool) -> Self {
        self.include_history = include;
        self
    }

    /// History is delivered together with the diff, so asking for either
    /// selects the git-first workflow.
    pub fn wants_diff(&self) -> bool {
        self.include_diff || self.include_history
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Learning unfamiliar code
    Standard,
    /// Reviewing a change, diff first
    GitFirst,
}

impl WorkflowKind {
    pub fn for_diff(wants_diff: bool) -> Self {
        if wants_diff {
            Self::GitFirst
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::GitFirst => "git-first",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "standard learning workflow",
            Self::GitFirst => "git-first review workflow",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deterministic step of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "section")]
pub enum Step {
    ReadSource,
    FetchDiff,
    Specialist(SectionKind),
    Persist,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadSource => f.write_str("read source"),
            Self::FetchDiff => f.write_str("fetch diff"),
            Self::Specialist(kind) => write!(f, "specialist: {}", kind),
            Self::Persist => f.write_str("persist document"),
        }
    }
}

const STANDARD_STEPS: &[Step] = &[
    Step::ReadSource,
    Step::Specialist(SectionKind::Language),
    Step::Specialist(SectionKind::Explanation),
    Step::Specialist(SectionKind::Documentation),
    Step::Persist,
];

const GIT_FIRST_STEPS: &[Step] = &[
    Step::ReadSource,
    Step::FetchDiff,
    Step::Specialist(SectionKind::DiffAnalysis),
    Step::Specialist(SectionKind::Explanation),
    Step::Specialist(SectionKind::Language),
    Step::Specialist(SectionKind::Documentation),
    Step::Persist,
];

/// The fixed step sequence for a request, plus its instruction text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    kind: WorkflowKind,
    steps: &'static [Step],
    instructions: String,
}

impl WorkflowPlan {
    pub fn for_request(request: &AnalysisRequest) -> Self {
        let kind = WorkflowKind::for_diff(request.wants_diff());
        let steps = match kind {
            WorkflowKind::Standard => STANDARD_STEPS,
            WorkflowKind::GitFirst => GIT_FIRST_STEPS,
        };
        Self {
            kind,
            steps,
            instructions: build_workflow(
                &request.file_path,
                &request.task_description,
                request.wants_diff(),
            ),
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn steps(&self) -> &[Step] {
        self.steps
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn fetches_diff(&self) -> bool {
        self.steps.contains(&Step::FetchDiff)
    }

    /// Specialist sections in execution order
    pub fn specialists(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Specialist(kind) => Some(*kind),
            _ => None,
        })
    }

    /// Number of specialist calls this plan makes
    pub fn specialist_count(&self) -> usize {
        self.specialists().count()
    }
}

/// Render the instruction text for a workflow. Pure: the same inputs always
/// give the same text.
pub fn build_workflow(file_path: &str, task_description: &str, wants_diff: bool) -> String {
    match WorkflowKind::for_diff(wants_diff) {
        WorkflowKind::GitFirst => git_first_workflow(file_path, task_description),
        WorkflowKind::Standard => standard_workflow(file_path, task_description),
    }
}

fn git_first_workflow(file_path: &str, task_description: &str) -> String {
    format!(
        "Review the change to {file_path}

Task context: {task_description}

CODE REVIEW WORKFLOW (git-first)

1. Read the current contents of {file_path}.
2. Fetch the diff for {file_path}, with commit history when requested.
   The diff shows what changed; commit messages explain why.
3. Analyze the diff: what changed, why, impact, risks.
4. Explain how the changed sections work and how data flows through them.
5. Teach the language features and patterns the change introduces.
6. Write pull-request documentation for the change.
7. Save the combined review document.

Focus on the specific lines that changed, the reasons behind them, how the
new code behaves, and what needs testing. The reader is an engineer
reviewing this change."
    )
}

fn standard_workflow(file_path: &str, task_description: &str) -> String {
    format!(
        "Analyze and document {file_path}

Task context: {task_description}

LEARNING WORKFLOW (standard)

1. Read the full contents of {file_path}.
2. Explain the programming language concepts: features, idioms, and
   comparisons with other languages.
3. Explain what the code does: a step-by-step walkthrough, its data flow,
   and its design decisions.
4. Document the implementation approach.
5. Save the combined learning document.

The reader is learning this codebase from scratch."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_diff() {
        assert!(!AnalysisRequest::new("a.rs").wants_diff());
        assert!(AnalysisRequest::new("a.rs").with_diff(true).wants_diff());
        assert!(AnalysisRequest::new("a.rs").with_history(true).wants_diff());
    }

    #[test]
    fn test_build_workflow_is_pure() {
        let a = build_workflow("src/lib.rs", "Added parser", true);
        let b = build_workflow("src/lib.rs", "Added parser", true);
        assert_eq!(a, b);
        assert_ne!(a, build_workflow("src/lib.rs", "Added parser", false));
    }

    #[test]
    fn test_build_workflow_templates() {
        let standard = build_workflow("foo.py", "", false);
        assert!(standard.contains("LEARNING WORKFLOW"));
        assert!(standard.contains("foo.py"));

        let review = build_workflow("foo.py", "Fix bug", true);
        assert!(review.contains("CODE REVIEW WORKFLOW"));
        assert!(review.contains("Task context: Fix bug"));
    }

    #[test]
    fn test_standard_plan() {
        let plan = WorkflowPlan::for_request(&AnalysisRequest::new("foo.py"));
        assert_eq!(plan.kind(), WorkflowKind::Standard);
        assert!(!plan.fetches_diff());
        assert_eq!(
            plan.specialists().collect::<Vec<_>>(),
            vec![SectionKind::Language, SectionKind::Explanation, SectionKind::Documentation]
        );
        assert_eq!(plan.steps().first(), Some(&Step::ReadSource));
        assert_eq!(plan.steps().last(), Some(&Step::Persist));
    }

    #[test]
    fn test_git_first_plan() {
        let request = AnalysisRequest::new("foo.py").with_history(true);
        let plan = WorkflowPlan::for_request(&request);
        assert_eq!(plan.kind(), WorkflowKind::GitFirst);
        assert_eq!(&plan.steps()[..3], &[
            Step::ReadSource,
            Step::FetchDiff,
            Step::Specialist(SectionKind::DiffAnalysis)
        ]);
        assert_eq!(plan.specialist_count(), 4);
        assert_eq!(plan.instructions(), build_workflow("foo.py", "", true));
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::Specialist(SectionKind::DiffAnalysis).to_string(), "specialist: diff_analysis");
        assert_eq!(Step::Persist.to_string(), "persist document");
    }
}
