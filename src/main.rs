use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use since_resolver::{
    load_for_repo, render_json, render_text, ConsoleStyle, GitBackend, RepoGuard, Updater,
    WriteMode,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "update-since-todo")]
#[command(
    about = "Replace TODO release placeholders with the first release containing each change",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Dry run - report what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Run as if started in this directory (defaults to the current one)
    #[arg(short = 'C', long, value_name = "PATH")]
    repo: Option<PathBuf>,

    /// Configuration file (defaults to .since-todo.toml at the repository root)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Format of the final report
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Show a unified diff of each rewritten line
    #[arg(long)]
    diff: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}

fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,since_resolver=info,update_since_todo=info".to_string(),
            2 => "info,since_resolver=debug,update_since_todo=debug".to_string(),
            _ => "debug,since_resolver=trace,update_since_todo=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let start = match cli.repo {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let backend = GitBackend::discover(&start)
        .with_context(|| format!("{} is not inside a git worktree", start.display()))?;
    let root = backend.root().to_path_buf();
    info!(root = %root.display(), "repository found");

    let config = load_for_repo(&root, cli.config.as_deref())?;
    let guard = RepoGuard::new(&root)?;

    let mode = if cli.dry_run {
        warn!("dry run: no files will be modified");
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };

    let updater = Updater::new(backend, config, guard)
        .with_mode(mode)
        .with_console(ConsoleStyle::from_env())
        .with_diff(cli.diff);

    // JSON output must stay a single parseable document on stdout.
    let mut trace: Box<dyn Write> = match cli.format {
        Format::Text => Box::new(io::stdout()),
        Format::Json => Box::new(io::stderr()),
    };
    let summary = updater.run(&mut trace)?;
    trace.flush()?;

    info!(
        candidates = summary.candidates,
        rewritten = summary.applied(),
        unreleased = summary.soft_misses.len(),
        "placeholders processed"
    );

    let config = updater.config();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        Format::Text => {
            writeln!(out)?;
            render_text(&summary.aggregate, &config.links, &mut out)?;
        }
        Format::Json => render_json(&summary.aggregate, &config.tag_prefix, &mut out)?,
    }
    out.flush()?;

    Ok(())
}
