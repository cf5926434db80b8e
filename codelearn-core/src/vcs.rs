//! # Version control inspector
//!
//! Fetches a file's diff and, optionally, its recent commit history by
//! shelling out to `git`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Rendered when `git diff` has no output
pub const NO_CHANGES: &str = "No changes found in diff";

/// What to diff against and whether to prepend history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Diff against `HEAD~N`
    pub commits_back: u32,
    /// Explicit ref to diff against; overrides `commits_back`
    pub compare_with: Option<String>,
    pub include_history: bool,
    pub history_limit: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            commits_back: 1,
            compare_with: None,
            include_history: false,
            history_limit: 10,
        }
    }
}

impl DiffOptions {
    pub fn with_history(mut self, include: bool) -> Self {
        self.include_history = include;
        self
    }

    pub fn with_compare_with(mut self, reference: impl Into<String>) -> Self {
        self.compare_with = Some(reference.into());
        self
    }

    pub fn with_commits_back(mut self, n: u32) -> Self {
        self.commits_back = n;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// The ref passed to `git diff`
    pub fn base_ref(&self) -> String {
        match &self.compare_with {
            Some(reference) if !reference.is_empty() => reference.clone(),
            _ => format!("HEAD~{}", self.commits_back.max(1)),
        }
    }
}

/// One entry of `git log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Abbreviated to 8 characters
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// Source of diff and history text for a file
#[allow(async_fn_in_trait)]
pub trait VersionControl: Send + Sync {
    /// Diff for `path` (empty path means the whole tree), with history
    /// prepended when `options.include_history` is set.
    async fn diff(&self, path: &str, options: &DiffOptions) -> Result<String>;
}

/// `git` command line backend
#[derive(Debug, Clone)]
pub struct GitInspector {
    program: String,
    work_dir: Option<PathBuf>,
}

impl Default for GitInspector {
    fn default() -> Self {
        Self {
            program: "git".into(),
            work_dir: None,
        }
    }
}

impl GitInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git inside `dir` instead of the process working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program, ?args, "running version control command");

        cmd.output().await.map_err(|e| {
            Error::external_tool(&self.program, format!("failed to launch: {}", e))
                .with_operation("vcs::run")
                .set_source(e)
        })
    }

    /// Recent commits touching `path`, newest first
    pub async fn history(&self, path: &str, limit: usize) -> Result<Vec<CommitEntry>> {
        let mut args = vec![
            "log".to_string(),
            format!("-{}", limit),
            "--pretty=format:%H|%an|%ae|%ad|%s".to_string(),
            "--date=short".to_string(),
        ];
        if !path.is_empty() {
            args.push("--follow".into());
            args.push("--".into());
            args.push(path.into());
        }

        let output = self.run(&args).await?;
        if !output.status.success() {
            // a file with no history is not fatal for the diff itself
            debug!(path, stderr = %String::from_utf8_lossy(&output.stderr).trim(), "git log failed");
            return Ok(Vec::new());
        }
        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl VersionControl for GitInspector {
    async fn diff(&self, path: &str, options: &DiffOptions) -> Result<String> {
        let history = if options.include_history {
            self.history(path, options.history_limit).await?
        } else {
            Vec::new()
        };

        let mut args = vec!["diff".to_string(), options.base_ref()];
        if !path.is_empty() {
            args.push("--".into());
            args.push(path.into());
        }

        let output = self.run(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::external_tool(&self.program, stderr)
                .with_operation("vcs::diff")
                .with_context("path", path)
                .with_context("base_ref", options.base_ref()));
        }

        let diff = String::from_utf8_lossy(&output.stdout);
        Ok(render_diff(&history, &diff))
    }
}

/// Parse `git log --pretty=format:%H|%an|%ae|%ad|%s` output. Lines that do
/// not have exactly five fields are skipped.
pub fn parse_log(output: &str) -> Vec<CommitEntry> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() != 5 {
                return None;
            }
            Some(CommitEntry {
                hash: parts[0].chars().take(8).collect(),
                author: parts[1].to_string(),
                date: parts[3].to_string(),
                message: parts[4].to_string(),
            })
        })
        .collect()
}

/// Numbered history block placed before the diff
pub fn format_history(commits: &[CommitEntry]) -> String {
    let mut out = format!("\n=== COMMIT HISTORY ({} recent commits) ===\n\n", commits.len());
    for (i, commit) in commits.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {} - {}\n   By: {}\n\n",
            i + 1,
            commit.date,
            commit.hash,
            commit.message,
            commit.author
        ));
    }
    out
}

fn render_diff(history: &[CommitEntry], diff: &str) -> String {
    let diff = if diff.trim().is_empty() { NO_CHANGES } else { diff };
    if history.is_empty() {
        diff.to_string()
    } else {
        format!("{}{}", format_history(history), diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log() {
        let raw = "0123456789abcdef|Ada|ada@example.com|2024-05-01|Add parser\n\
                   fedcba9876543210|Linus|l@example.com|2024-04-30|Initial commit\n\
                   garbage line\n";
        let commits = parse_log(raw);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "01234567");
        assert_eq!(commits[0].author, "Ada");
        assert_eq!(commits[0].date, "2024-05-01");
        assert_eq!(commits[1].message, "Initial commit");
    }

    #[test]
    fn test_parse_log_skips_messages_with_pipes() {
        let commits = parse_log("abc|A|a@x|2024-01-01|fix a|b split");
        assert!(commits.is_empty());
    }

    #[test]
    fn test_format_history() {
        let commits = vec![CommitEntry {
            hash: "01234567".into(),
            author: "Ada".into(),
            date: "2024-05-01".into(),
            message: "Add parser".into(),
        }];
        assert_eq!(
            format_history(&commits),
            "\n=== COMMIT HISTORY (1 recent commits) ===\n\n1. [2024-05-01] 01234567 - Add parser\n   By: Ada\n\n"
        );
    }

    #[test]
    fn test_render_diff() {
        assert_eq!(render_diff(&[], "  \n"), NO_CHANGES);
        assert_eq!(render_diff(&[], "+a\n"), "+a\n");

        let commits = parse_log("0123456789|Ada|a@x|2024-05-01|msg");
        let rendered = render_diff(&commits, "");
        assert!(rendered.starts_with("\n=== COMMIT HISTORY (1 recent commits) ==="));
        assert!(rendered.ends_with(NO_CHANGES));
    }

    #[test]
    fn test_base_ref() {
        assert_eq!(DiffOptions::default().base_ref(), "HEAD~1");
        assert_eq!(DiffOptions::default().with_commits_back(3).base_ref(), "HEAD~3");
        assert_eq!(
            DiffOptions::default()
                .with_commits_back(3)
                .with_compare_with("main")
                .base_ref(),
            "main"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_failure() {
        let git = GitInspector::new().with_program("definitely-not-a-vcs-binary");
        let err = git.diff("foo.py", &DiffOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalToolFailed);
        assert_eq!(err.context_value("tool"), Some("definitely-not-a-vcs-binary"));
    }

    #[tokio::test]
    async fn test_diff_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        let git = GitInspector::new().in_dir(dir.path());
        match git.diff("foo.py", &DiffOptions::default()).await {
            Err(err) => assert_eq!(err.kind(), ErrorKind::ExternalToolFailed),
            // only reachable if the temp dir sits inside a checkout
            Ok(_) => {}
        }
    }

    /// Run git in `dir` with a throwaway identity; false if git is unavailable
    fn git(dir: &std::path::Path, args: &[&str]) -> bool {
        std::process::Command::new("git")
            .args(["-c", "user.name=Ada", "-c", "user.email=ada@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_diff_and_history_in_real_repository() {
        let dir = TempDir::new().unwrap();
        if !git(dir.path(), &["init", "-q"]) {
            return;
        }
        std::fs::write(dir.path().join("a.py"), "print(1)\n").unwrap();
        assert!(git(dir.path(), &["add", "a.py"]));
        assert!(git(dir.path(), &["commit", "-q", "-m", "first"]));
        std::fs::write(dir.path().join("a.py"), "print(2)\n").unwrap();
        assert!(git(dir.path(), &["commit", "-q", "-am", "second"]));

        let inspector = GitInspector::new().in_dir(dir.path());

        let diff = inspector.diff("a.py", &DiffOptions::default()).await.unwrap();
        assert!(diff.contains("-print(1)"));
        assert!(diff.contains("+print(2)"));
        assert!(!diff.contains("COMMIT HISTORY"));

        let unchanged = DiffOptions::default().with_compare_with("HEAD");
        assert_eq!(inspector.diff("a.py", &unchanged).await.unwrap(), NO_CHANGES);

        let with_history = DiffOptions::default().with_history(true);
        let rendered = inspector.diff("a.py", &with_history).await.unwrap();
        assert!(rendered.starts_with("\n=== COMMIT HISTORY (2 recent commits) ===\n\n1. ["));
        assert!(rendered.contains(" - second\n   By: Ada\n"));
        assert!(rendered.contains("2. ["));
        assert!(rendered.contains(" - first\n"));
        assert!(rendered.ends_with("+print(2)\n"));
    }
}
