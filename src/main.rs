use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use patch_review::config::load_config;
use patch_review::diff::{diff_contents, render_entries};
use patch_review::review::{reconcile, Decision, Decisions, LineKey, LineKind};
use patch_review::{
    FileOperation, FsStore, OpenBuffers, PreviewedOperation, ReviewEngine, ReviewSession,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Review proposed file edits line by line
#[derive(Parser)]
#[command(name = "patch-review", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the line diff between two files
    Diff {
        before: PathBuf,
        after: PathBuf,
        /// Emit diff entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview proposed operations without writing anything
    Preview {
        /// JSON array of operations ('-' reads stdin)
        ops: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// File-list filter expression (e.g. '+*.rs,-*.lock')
        #[arg(long)]
        filter: Option<String>,
        /// Line to decline, as PATH:+N (added) or PATH:-N (removed)
        #[arg(long, value_parser = parse_line_ref)]
        decline: Vec<LineRef>,
        #[arg(long)]
        json: bool,
    },
    /// Review proposed operations with the given decisions and apply them
    Apply {
        /// JSON array of operations ('-' reads stdin)
        ops: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Line to accept, as PATH:+N or PATH:-N
        #[arg(long, value_parser = parse_line_ref)]
        accept: Vec<LineRef>,
        /// Line to decline, as PATH:+N or PATH:-N
        #[arg(long, value_parser = parse_line_ref)]
        decline: Vec<LineRef>,
    },
    /// Print the effective configuration
    Config {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

/// One line of one file, addressed from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineRef {
    path: String,
    kind: LineKind,
    line: usize,
}

fn parse_line_ref(s: &str) -> Result<LineRef, String> {
    let (path, line) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PATH:+N or PATH:-N, got {s:?}"))?;
    let (kind, number) = if let Some(n) = line.strip_prefix('+') {
        (LineKind::Added, n)
    } else if let Some(n) = line.strip_prefix('-') {
        (LineKind::Removed, n)
    } else {
        return Err(format!("line must start with + or -, got {line:?}"));
    };
    let line = number
        .parse::<usize>()
        .map_err(|e| format!("bad line number {number:?}: {e}"))?;
    let path = path.trim();
    if path.is_empty() || line == 0 {
        return Err(format!("invalid line reference {s:?}"));
    }
    Ok(LineRef {
        path: path.to_string(),
        kind,
        line,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Diff {
            before,
            after,
            json,
        } => run_diff(&before, &after, json),
        Command::Preview {
            ops,
            root,
            filter,
            decline,
            json,
        } => run_preview(&ops, &root, filter.as_deref(), &decline, json).await,
        Command::Apply {
            ops,
            root,
            accept,
            decline,
        } => run_apply(&ops, &root, &accept, &decline).await,
        Command::Config { root } => {
            let config = load_config(&root);
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("patch_review=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run_diff(before: &Path, after: &Path, json: bool) -> Result<()> {
    let read = |p: &Path| {
        std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
    };
    let config = load_config(Path::new("."));
    let entries = diff_contents(&read(before)?, &read(after)?, &config.diff_limits());

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("--- {}", before.display());
        println!("+++ {}", after.display());
        print!("{}", render_entries(&entries));
    }
    Ok(())
}

fn read_operations(source: &str) -> Result<Vec<FileOperation>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read operations from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {source}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("Failed to parse operations in {source}"))
}

async fn open_session(ops: &str, root: &Path) -> Result<ReviewSession> {
    let operations = read_operations(ops)?;
    let config = load_config(root);
    let store = Arc::new(FsStore::new(root));
    let engine = ReviewEngine::new(store, OpenBuffers::new(), config);
    Ok(engine.propose(operations).await?)
}

fn operation_index(session: &ReviewSession, path: &str) -> Result<usize> {
    match session.operations().iter().position(|op| op.path() == path) {
        Some(index) => Ok(index),
        None => bail!("no proposed operation for {path}"),
    }
}

#[derive(Serialize)]
struct PreviewReport<'a> {
    #[serde(flatten)]
    preview: &'a PreviewedOperation,
    added: usize,
    removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    reconciled: Option<String>,
}

async fn run_preview(
    ops: &str,
    root: &Path,
    filter: Option<&str>,
    decline: &[LineRef],
    json: bool,
) -> Result<()> {
    let mut session = open_session(ops, root).await?;
    if let Some(expr) = filter {
        session.set_filter(expr);
    }

    // Decisions are evaluated locally so the preview never writes
    let mut decisions = Decisions::new();
    for target in decline {
        let operation = operation_index(&session, &target.path)?;
        decisions.decide(
            [LineKey {
                operation,
                line: target.line,
                kind: target.kind,
            }],
            Decision::Declined,
        );
    }

    let reports: Vec<PreviewReport> = session
        .visible_operations()
        .into_iter()
        .map(|(i, preview)| {
            let (added, removed) = preview.change_counts();
            let view = decisions.for_operation(i);
            PreviewReport {
                preview,
                added,
                removed,
                reconciled: (!view.is_empty()).then(|| reconcile(preview, view)),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let op = report.preview;
        println!(
            "{} {} (+{} -{})",
            op.kind().symbol(),
            op.path(),
            report.added,
            report.removed
        );
        print!("{}", render_entries(&op.diff));
        if let Some(content) = &report.reconciled {
            println!("--- reconciled {}", op.path());
            println!("{content}");
        }
        println!();
    }
    let hidden = session.operations().len() - reports.len();
    if hidden > 0 {
        println!("{hidden} operation(s) hidden by filter");
    }
    Ok(())
}

async fn run_apply(ops: &str, root: &Path, accept: &[LineRef], decline: &[LineRef]) -> Result<()> {
    let mut session = open_session(ops, root).await?;
    if session.operations().is_empty() {
        println!("nothing to apply");
        return Ok(());
    }
    session.start_review()?;

    for (targets, decision) in [(accept, Decision::Accepted), (decline, Decision::Declined)] {
        for target in targets {
            let index = operation_index(&session, &target.path)?;
            let lines = [target.line];
            match decision {
                Decision::Accepted => session.accept_lines(index, target.kind, &lines)?,
                Decision::Declined => session.decline_lines(index, target.kind, &lines)?,
            };
        }
    }

    for failure in session.settle().await {
        log::warn!("Intermediate write failed: {}", failure);
    }
    let stale = session.stale_paths().await;
    if !stale.is_empty() {
        log::warn!("Changed since preview: {}", stale.join(", "));
    }

    let summary = session.apply().await.context("Apply failed")?;
    for path in &summary.written {
        println!("wrote {path}");
    }
    for path in &summary.deleted {
        println!("deleted {path}");
    }
    Ok(())
}
