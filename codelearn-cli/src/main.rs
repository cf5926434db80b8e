//! # codelearn CLI
//!
//! Command-line interface for generating learning documents.
//!
//! Usage:
//!   codelearn analyze <file> [-t <task>] [--diff] [--history]
//!   codelearn batch <file>... [-t <task>] [--keep-going]
//!   codelearn plan <file> [--diff] [--json]
//!   codelearn ideas [topic]
//!
//! Examples:
//!   codelearn analyze src/parser.rs -t "Added error recovery"
//!   codelearn analyze app/models/user.rb --diff --history
//!   codelearn batch lib/a.py lib/b.py --keep-going
//!   codelearn ideas "Platform engineering"

use anyhow::Context;
use clap::{Parser, Subcommand};
use codelearn_agent::{
    AnalysisEvent, BatchEvent, BatchRunner, FailurePolicy, Orchestrator, TalkIdeas,
};
use codelearn_core::config::{BASE_URL_VAR, DOCS_DIR_VAR, MODEL_VAR, PROVIDER_VAR, TIMEOUT_VAR};
use codelearn_core::{
    AnalysisRequest, AnyProvider, AppConfig, DiffOptions, DocumentSink, FileSink, FsSourceReader, GitInspector,
    LlmProvider, MemorySink, ProviderGenerator, WorkflowPlan,
};
use futures_util::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codelearn")]
#[command(author, version, about = "codelearn - turn source files into learning documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model provider: openai, anthropic, deepseek or local
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model name (overrides the provider default)
    #[arg(long, global = true)]
    model: Option<String>,

    /// API base URL (OpenAI-compatible gateways, local servers)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Timeout in seconds for each external call
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory learning documents are written to
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only errors, warnings and final results
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one file and save a learning document
    Analyze {
        file: String,

        /// What was done in this file (e.g. "Added retry support")
        #[arg(short, long, default_value = "")]
        task: String,

        /// Include the file's diff (code review workflow)
        #[arg(long)]
        diff: bool,

        /// Include recent commit history (implies the review workflow)
        #[arg(long)]
        history: bool,

        /// Diff against this ref instead of HEAD~N
        #[arg(long)]
        compare_with: Option<String>,

        /// Diff against HEAD~N (default: 1)
        #[arg(long)]
        commits_back: Option<u32>,

        /// Print the document instead of saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze several files, one after another
    Batch {
        #[arg(required = true)]
        files: Vec<String>,

        /// Shared task context for every file
        #[arg(short, long, default_value = "")]
        task: String,

        /// Keep going when a file fails instead of stopping
        #[arg(long)]
        keep_going: bool,

        /// Keep documents in memory instead of saving them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the workflow an analysis would run, without calling any service
    Plan {
        file: String,

        #[arg(short, long, default_value = "")]
        task: String,

        #[arg(long)]
        diff: bool,

        #[arg(long)]
        history: bool,

        /// Print the steps as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stream tech talk ideas for a topic
    Ideas {
        /// Summit topic (default: "AI in DevOps")
        #[arg(trailing_var_arg = true)]
        topic: Vec<String>,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve configuration from the environment with flags taking precedence
fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    load_config_from(cli, |key| std::env::var(key).ok())
}

/// Flags are fed through the same lookup as the environment so that
/// validation sees the final values
fn load_config_from<F>(cli: &Cli, env: F) -> anyhow::Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let flag = |key: &str| -> Option<String> {
        match key {
            PROVIDER_VAR => cli.provider.clone(),
            MODEL_VAR => cli.model.clone(),
            BASE_URL_VAR => cli.base_url.clone(),
            TIMEOUT_VAR => cli.timeout.map(|secs| secs.to_string()),
            DOCS_DIR_VAR => cli.docs_dir.as_ref().map(|dir| dir.display().to_string()),
            _ => None,
        }
    };
    Ok(AppConfig::from_lookup(|key| flag(key).or_else(|| env(key)))?)
}

fn build_generator(config: &AppConfig) -> anyhow::Result<ProviderGenerator<AnyProvider>> {
    let provider = AnyProvider::from_config(config.provider.clone())
        .map_err(|e| e.into_error("cli::provider"))?;
    debug!(provider = provider.name(), model = provider.default_model(), "provider ready");
    Ok(ProviderGenerator::new(provider))
}

type CliOrchestrator<S> = Orchestrator<FsSourceReader, GitInspector, ProviderGenerator<AnyProvider>, S>;

fn build_orchestrator<S: DocumentSink>(
    config: &AppConfig,
    generator: ProviderGenerator<AnyProvider>,
    diff_options: DiffOptions,
    sink: S,
) -> CliOrchestrator<S> {
    Orchestrator::new(FsSourceReader::new(), GitInspector::new(), generator, sink)
        .with_retry(config.retry)
        .with_diff_options(diff_options)
}

async fn run_analysis<S: DocumentSink>(
    orchestrator: CliOrchestrator<S>,
    request: AnalysisRequest,
    dry_run: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let events = orchestrator.analyze(request);
    futures_util::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event? {
            AnalysisEvent::Progress(message) => {
                if !quiet {
                    println!("{}", message);
                }
            }
            AnalysisEvent::Completed(report) => {
                if dry_run {
                    println!("\n{}", report.document.to_markdown());
                } else {
                    println!("Documentation saved to {}", report.location);
                }
            }
        }
    }

    let usage = orchestrator.generator().usage();
    debug!(calls = usage.total_calls, tokens = usage.total_tokens(), "token usage");
    Ok(())
}

/// Stdout text for a batch event; dry runs append the rendered document
fn batch_line(event: &BatchEvent, dry_run: bool) -> String {
    match event {
        BatchEvent::Completed { report, .. } if dry_run => {
            format!("{}\n\n{}", event, report.document.to_markdown())
        }
        _ => event.to_string(),
    }
}

async fn run_batch<S: DocumentSink>(
    runner: BatchRunner<FsSourceReader, GitInspector, ProviderGenerator<AnyProvider>, S>,
    files: Vec<String>,
    task: &str,
    dry_run: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let events = runner.analyze_many(files, task);
    futures_util::pin_mut!(events);

    let mut failed = 0;
    while let Some(event) = events.next().await {
        let event = event?;
        match &event {
            BatchEvent::Progress { .. } if quiet => {}
            BatchEvent::Failed { .. } => eprintln!("{}", event),
            BatchEvent::Finished(summary) => {
                failed = summary.failed;
                println!("{}", event);
            }
            _ => println!("{}", batch_line(&event, dry_run)),
        }
    }

    anyhow::ensure!(failed == 0, "{} file(s) failed", failed);
    Ok(())
}

async fn run_ideas(config: &AppConfig, topic: &str) -> anyhow::Result<()> {
    let provider = AnyProvider::from_config(config.provider.clone())
        .map_err(|e| e.into_error("cli::provider"))?;
    let talk = TalkIdeas::new(provider).with_retry(config.retry);

    let chunks = talk.ideas(topic);
    futures_util::pin_mut!(chunks);

    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        write!(stdout, "{}", chunk?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn plan_json(plan: &WorkflowPlan) -> serde_json::Value {
    serde_json::json!({
        "workflow": plan.kind(),
        "steps": plan.steps(),
        "instructions": plan.instructions(),
    })
}

fn print_plan(request: &AnalysisRequest, json: bool) -> anyhow::Result<()> {
    let plan = WorkflowPlan::for_request(request);
    if json {
        println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        return Ok(());
    }

    println!("{}\n", plan.instructions());
    println!("Steps ({}):", plan.kind());
    for (i, step) in plan.steps().iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Plan {
            file,
            task,
            diff,
            history,
            json,
        } => {
            let request = AnalysisRequest::new(file.clone())
                .with_task(task.clone())
                .with_diff(*diff)
                .with_history(*history);
            print_plan(&request, *json)
        }
        Commands::Analyze {
            file,
            task,
            diff,
            history,
            compare_with,
            commits_back,
            dry_run,
        } => {
            let config = load_config(&cli)?;
            let request = AnalysisRequest::new(file.clone())
                .with_task(task.clone())
                .with_diff(*diff || compare_with.is_some() || commits_back.is_some())
                .with_history(*history);

            let mut diff_options = config.diff.clone();
            if let Some(reference) = compare_with {
                diff_options = diff_options.with_compare_with(reference.clone());
            }
            if let Some(n) = commits_back {
                diff_options = diff_options.with_commits_back(*n);
            }

            let generator = build_generator(&config)?;
            if *dry_run {
                let orchestrator = build_orchestrator(&config, generator, diff_options, MemorySink::new());
                run_analysis(orchestrator, request, true, cli.quiet).await
            } else {
                let sink = FileSink::new(&config.docs_dir);
                let orchestrator = build_orchestrator(&config, generator, diff_options, sink);
                run_analysis(orchestrator, request, false, cli.quiet).await
            }
        }
        Commands::Batch {
            files,
            task,
            keep_going,
            dry_run,
        } => {
            let config = load_config(&cli)?;
            let policy = if *keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            };
            let generator = build_generator(&config)?;
            let diff_options = config.diff.clone();

            if *dry_run {
                let orchestrator = build_orchestrator(&config, generator, diff_options, MemorySink::new());
                let runner = BatchRunner::new(orchestrator).with_policy(policy);
                run_batch(runner, files.clone(), task, true, cli.quiet).await
            } else {
                let sink = FileSink::new(&config.docs_dir);
                let orchestrator = build_orchestrator(&config, generator, diff_options, sink);
                let runner = BatchRunner::new(orchestrator).with_policy(policy);
                run_batch(runner, files.clone(), task, false, cli.quiet).await
            }
        }
        Commands::Ideas { topic } => {
            let config = load_config(&cli).context("ideas need a configured provider")?;
            run_ideas(&config, &topic.join(" ")).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use codelearn_core::ProviderType;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "codelearn", "analyze", "src/lib.rs", "-t", "Added parser", "--history", "--model", "gpt-4o-mini",
        ])
        .unwrap();
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
        match cli.command {
            Commands::Analyze {
                file,
                task,
                diff,
                history,
                ..
            } => {
                assert_eq!(file, "src/lib.rs");
                assert_eq!(task, "Added parser");
                assert!(!diff);
                assert!(history);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_batch_requires_files() {
        assert!(Cli::try_parse_from(["codelearn", "batch"]).is_err());
        let cli = Cli::try_parse_from(["codelearn", "batch", "a.py", "b.py", "--keep-going"]).unwrap();
        assert!(matches!(cli.command, Commands::Batch { ref files, keep_going: true, .. } if files.len() == 2));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["codelearn", "-v", "-q", "plan", "a.rs"]).is_err());
    }

    #[test]
    fn test_ideas_topic_words() {
        let cli = Cli::try_parse_from(["codelearn", "ideas", "Platform", "engineering"]).unwrap();
        match cli.command {
            Commands::Ideas { topic } => assert_eq!(topic.join(" "), "Platform engineering"),
            _ => panic!("expected ideas"),
        }
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_local_provider_from_flags_alone() {
        let cli = Cli::try_parse_from([
            "codelearn",
            "--provider",
            "local",
            "--base-url",
            "http://localhost:8000/v1",
            "--model",
            "llama3",
            "plan",
            "a.rs",
        ])
        .unwrap();

        let config = load_config_from(&cli, env(&[])).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::Local);
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:8000/v1"));
        assert_eq!(config.provider.default_model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = Cli::try_parse_from([
            "codelearn", "--timeout", "7", "--docs-dir", "out", "--model", "gpt-4o-mini", "plan", "a.rs",
        ])
        .unwrap();

        let config = load_config_from(
            &cli,
            env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("CODELEARN_TIMEOUT_SECS", "300"),
                ("CODELEARN_DOCS_DIR", "elsewhere"),
                ("CODELEARN_MODEL", "gpt-4o"),
            ]),
        )
        .unwrap();
        assert_eq!(config.retry.timeout, std::time::Duration::from_secs(7));
        assert_eq!(config.docs_dir, PathBuf::from("out"));
        assert_eq!(config.provider.default_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.provider.timeout_secs, Some(7));
    }

    #[test]
    fn test_zero_timeout_flag_rejected() {
        let cli = Cli::try_parse_from(["codelearn", "--timeout", "0", "plan", "a.rs"]).unwrap();
        assert!(load_config_from(&cli, env(&[("OPENAI_API_KEY", "sk-test")])).is_err());
    }

    #[test]
    fn test_plan_json_has_kind_steps_and_instructions() {
        let plan = WorkflowPlan::for_request(&AnalysisRequest::new("app.rb").with_diff(true));
        let value = plan_json(&plan);

        assert_eq!(value["workflow"], "git_first");
        assert_eq!(value["steps"].as_array().unwrap().len(), plan.steps().len());
        assert_eq!(value["instructions"], plan.instructions());
        assert!(value["instructions"].as_str().unwrap().contains("app.rb"));
    }

    #[test]
    fn test_batch_dry_run_prints_document() {
        let mut document = codelearn_core::LearningDocument::new("a.py");
        document.add(codelearn_core::SpecialistOutput::new(
            codelearn_core::SectionKind::Explanation,
            "It prints a.",
        ));
        let event = BatchEvent::Completed {
            path: "a.py".into(),
            report: codelearn_agent::AnalysisReport {
                document,
                location: "memory://1".into(),
            },
        };

        let saved = batch_line(&event, false);
        assert_eq!(saved, "Finished a.py -> memory://1");

        let printed = batch_line(&event, true);
        assert!(printed.starts_with("Finished a.py -> memory://1\n\n# a.py - Learning Documentation\n"));
        assert!(printed.contains("## How The Code Works\n\nIt prints a."));
    }
}
