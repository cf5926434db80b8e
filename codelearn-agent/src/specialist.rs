//! Specialist dispatcher - one fixed system prompt per document section

use codelearn_core::{Result, SectionKind, SourceFile, SpecialistOutput, TextGenerator};
use tracing::debug;

const LANGUAGE_TEACHER: &str = "\
You are an enthusiastic programming language teacher. Given a source file, \
teach the language concepts it actually uses so the reader can think like a \
developer in that language.

For each concept:
- Show the real code from the file, with line numbers.
- Say what the feature is, why the language has it, and how it works.
- Compare it with how Python, JavaScript or another common language would \
express the same thing.
- Point out mistakes beginners make with it and give one practical tip.

Group concepts by theme (type system, object model, concurrency, ...) and go \
deep on the ones that matter most in this file. Use analogies where they help. \
Stay specific to this code; generic language tutorials are not useful here.";

const CODE_EXPLAINER: &str = "\
You explain exactly what a piece of code does and how it does it.

1. Start with a one-paragraph overview: what the code is for and its main parts.
2. Walk through every significant function or method. Quote its signature and \
the important lines, and explain what each step does and what it returns.
3. Show the data flow explicitly, as input -> processing steps -> output, for \
each major path through the code.
4. Explain why the code is structured the way it is and what would break if \
it changed.
5. Cover edge cases, error handling, and the assumptions the code makes.

Quote real code throughout. The reader should understand the file well enough \
to rewrite it.";

const CHANGE_DOCUMENTER: &str = "\
You are a senior engineer writing pull-request documentation your teammates \
will want to read. Use these sections:

## Summary - one sentence on what changed and why, who is affected, and a risk \
level (low, medium or high).
## Motivation & Context - the problem being solved and why now.
## Technical Implementation - the approach, key decisions and the trade-offs \
behind them, with code snippets of the important parts.
## Testing Strategy - scenarios and edge cases covered, manual and automated.
## Risks & Considerations - what could break, performance, compatibility, \
deployment and rollback.
## Alternatives Considered - other approaches and why they were not chosen.
## References - related docs and similar patterns in the codebase.

Write professionally but conversationally, so a reviewer can understand the \
change and approve it with confidence.";

const DIFF_ANALYZER: &str = "\
You are a code review expert. Given version control output for a file, \
explain what changed.

1. Overview: nature of the change (feature, fix, refactor), its scope and impact.
2. Change by change: quote each significant hunk, say what changed, why it \
matters, and how behaviour differs before and after.
3. Logic changes: algorithms, control flow, data structures, error handling.
4. Risks: breaking changes, performance, affected edge cases, migrations.
5. Code quality: practices adopted and technical debt addressed.

When commit history is included, connect commit messages to the code changes, \
describe how the file evolved across commits, and use the messages to infer \
why each change was made.";

/// Fixed system prompt for a section
pub fn system_prompt(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Language => LANGUAGE_TEACHER,
        SectionKind::Explanation => CODE_EXPLAINER,
        SectionKind::Documentation => CHANGE_DOCUMENTER,
        SectionKind::DiffAnalysis => DIFF_ANALYZER,
    }
}

/// Display name used in progress messages
pub fn specialist_name(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Language => "language teacher",
        SectionKind::Explanation => "code explainer",
        SectionKind::Documentation => "change documenter",
        SectionKind::DiffAnalysis => "diff analyzer",
    }
}

/// Routes section requests to a text generator with the right prompt
pub struct SpecialistDispatcher<G: TextGenerator> {
    generator: G,
}

impl<G: TextGenerator> SpecialistDispatcher<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn explain_language_concepts(&self, input: &str) -> Result<String> {
        self.run(SectionKind::Language, input).await
    }

    pub async fn explain_code_behavior(&self, input: &str) -> Result<String> {
        self.run(SectionKind::Explanation, input).await
    }

    pub async fn document_change(&self, input: &str) -> Result<String> {
        self.run(SectionKind::Documentation, input).await
    }

    pub async fn analyze_diff(&self, input: &str) -> Result<String> {
        self.run(SectionKind::DiffAnalysis, input).await
    }

    /// Run the specialist for `kind`
    pub async fn dispatch(&self, kind: SectionKind, input: &str) -> Result<SpecialistOutput> {
        let text = match kind {
            SectionKind::Language => self.explain_language_concepts(input).await?,
            SectionKind::Explanation => self.explain_code_behavior(input).await?,
            SectionKind::Documentation => self.document_change(input).await?,
            SectionKind::DiffAnalysis => self.analyze_diff(input).await?,
        };
        Ok(SpecialistOutput::new(kind, text))
    }

    async fn run(&self, kind: SectionKind, input: &str) -> Result<String> {
        debug!(specialist = kind.as_str(), input_chars = input.len(), "dispatching specialist");
        self.generator
            .generate(system_prompt(kind), input)
            .await
            .map_err(|e| e.with_context("specialist", kind.as_str()))
    }
}

/// Build the user message for a specialist. The whole file is always
/// included; the diff is the subject of the diff analyzer and extra context
/// for the others.
pub fn compose_input(kind: SectionKind, source: &SourceFile, task: &str, diff: Option<&str>) -> String {
    let code = fenced(source);
    let mut input = match kind {
        SectionKind::Language => format!(
            "Teach me the programming language concepts in {} ({}). Here is the complete file:\n\n{}\n\n\
             Quote the actual lines you discuss, use analogies, compare with Python or JavaScript, \
             explain why each feature exists, and share common mistakes and practical tips. \
             Be specific to this code.",
            source.file_name, source.language, code
        ),
        SectionKind::Explanation => format!(
            "Explain step by step how {} works. Here is the complete file:\n\n{}\n\n\
             Start with the big picture, walk through each major function, show the data flow \
             as input -> process -> output, quote actual code, and explain the reasoning behind \
             the design.",
            source.file_name, code
        ),
        SectionKind::Documentation => format!(
            "Write pull-request documentation for {}. Here is the complete file:\n\n{}",
            source.file_name, code
        ),
        SectionKind::DiffAnalysis => format!(
            "Analyze the following version control output for {}:\n\n{}\n\nCurrent file for reference:\n\n{}",
            source.path,
            diff.unwrap_or(codelearn_core::vcs::NO_CHANGES),
            code
        ),
    };

    if !task.trim().is_empty() {
        input.push_str(&format!("\n\nTask context: {}", task.trim()));
    }

    if kind != SectionKind::DiffAnalysis {
        if let Some(diff) = diff {
            input.push_str(&format!(
                "\n\nThis is a code review. Focus on what this change introduces:\n\n```diff\n{}\n```",
                diff.trim_end()
            ));
        }
    }

    input
}

fn fenced(source: &SourceFile) -> String {
    let newline = if source.content.ends_with('\n') { "" } else { "\n" };
    format!(
        "```{}\n{}{}```",
        source.language.fence_tag(),
        source.content,
        newline
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelearn_core::{Error, ErrorKind};
    use std::sync::Mutex;

    struct Echo {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Echo {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl TextGenerator for Echo {
        async fn generate(&self, system_prompt: &str, input: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), input.to_string()));
            if self.fail {
                return Err(Error::external_service("backend down"));
            }
            Ok(format!("re: {}", input))
        }
    }

    #[tokio::test]
    async fn test_each_operation_uses_its_prompt() {
        let dispatcher = SpecialistDispatcher::new(Echo::new(false));
        dispatcher.explain_language_concepts("a").await.unwrap();
        dispatcher.explain_code_behavior("b").await.unwrap();
        dispatcher.document_change("c").await.unwrap();
        dispatcher.analyze_diff("d").await.unwrap();

        let calls = dispatcher.generator().calls.lock().unwrap();
        let prompts: Vec<&str> = calls.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            prompts,
            vec![LANGUAGE_TEACHER, CODE_EXPLAINER, CHANGE_DOCUMENTER, DIFF_ANALYZER]
        );
    }

    #[tokio::test]
    async fn test_dispatch_labels_output() {
        let dispatcher = SpecialistDispatcher::new(Echo::new(false));
        let output = dispatcher.dispatch(SectionKind::Documentation, "x").await.unwrap();
        assert_eq!(output.kind, SectionKind::Documentation);
        assert_eq!(output.text, "re: x");
    }

    #[tokio::test]
    async fn test_failure_propagates_without_retry() {
        let dispatcher = SpecialistDispatcher::new(Echo::new(true));
        let err = dispatcher.dispatch(SectionKind::Language, "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalServiceFailed);
        assert_eq!(err.context_value("specialist"), Some("language"));
        assert_eq!(dispatcher.generator().calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_compose_input_includes_whole_file() {
        let source = SourceFile::new("foo.py", "print(1)\n");
        let input = compose_input(SectionKind::Language, &source, "", None);
        assert!(input.contains("```python\nprint(1)\n```"));
        assert!(!input.contains("Task context"));
        assert!(!input.contains("```diff"));
    }

    #[test]
    fn test_compose_input_with_task_and_diff() {
        let source = SourceFile::new("lib.rs", "fn main() {}");
        let input = compose_input(SectionKind::Explanation, &source, "Added main", Some("+fn main() {}\n"));
        assert!(input.contains("```rust\nfn main() {}\n```"));
        assert!(input.contains("Task context: Added main"));
        assert!(input.contains("```diff\n+fn main() {}\n```"));

        let analysis = compose_input(SectionKind::DiffAnalysis, &source, "", Some("+fn main() {}"));
        assert!(analysis.starts_with("Analyze the following version control output for lib.rs:\n\n+fn main() {}"));
        assert!(!analysis.contains("```diff"));
    }
}
