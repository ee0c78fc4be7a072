//! # vfy CLI - Is my backup current?
//!
//! Compares a backup directory against its original and prints how much of
//! the original is missing or different in the backup.
//!
//! ## Usage
//! ```bash
//! # Size-only comparison
//! vfy /home/alice /mnt/backup/alice
//!
//! # Sample 16 windows per file, stay on one filesystem, skip caches
//! vfy -s 16 -x -i .cache -i node_modules /home/alice /mnt/backup/alice
//!
//! # Health check: one line of output, exit 2 above 1% difference
//! vfy -m --max-diff-percent 1 /srv/data /mnt/backup/data
//! ```
//!
//! ## Exit status
//! - `0`: verification ran (and stayed under `--max-diff-percent`, if given)
//! - `1`: bad arguments or unusable root directories
//! - `2`: difference percentage above `--max-diff-percent`

use anyhow::Context;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vfy::verifier::parse_sample_count;
use vfy::{ItemReport, LogPrefix, ReportSink, VerificationReport, VerifierBuilder};

/// vfy - Verify that a backup matches its original
#[derive(Parser)]
#[command(name = "vfy")]
#[command(version)]
#[command(about = "Estimate how far a backup directory has drifted from its original")]
#[command(long_about = None)]
struct Cli {
    /// Original directory
    #[arg(value_name = "ORIG_DIR")]
    original: PathBuf,

    /// Backup directory
    #[arg(value_name = "BACKUP_DIR")]
    backup: PathBuf,

    /// Also report identical items
    #[arg(short, long)]
    verbose: bool,

    /// Print the summary as a single key:value line
    #[arg(short, long)]
    machine: bool,

    /// Print the summary as JSON
    #[arg(long, conflicts_with = "machine")]
    json: bool,

    /// Descend into symlinks that point to directories
    #[arg(short, long)]
    follow: bool,

    /// Do not cross filesystem boundaries
    #[arg(short = 'x', long)]
    one_filesystem: bool,

    /// Count a missing directory as one item instead of one per entry below it
    #[arg(long)]
    no_count: bool,

    /// Directory name or glob to skip (repeatable)
    #[arg(short, long = "ignore", value_name = "DIR")]
    ignore: Vec<String>,

    /// Random samples compared per file (0 compares sizes only)
    #[arg(short, long = "samples", value_name = "COUNT", default_value = "0", value_parser = parse_sample_count)]
    samples: usize,

    /// Bytes read per sample
    #[arg(long, value_name = "N", default_value_t = vfy::DEFAULT_SAMPLE_WIDTH)]
    sample_width: usize,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    jobs: usize,

    /// Show a spinner while walking
    #[arg(long)]
    progress: bool,

    /// Exit with status 2 when the difference percentage is above P
    #[arg(long, value_name = "P")]
    max_diff_percent: Option<f64>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() || cli.machine || cli.json {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            let message = match e.downcast_ref::<vfy::VfyError>() {
                Some(err) => format!("{}: {}", e, err.user_message()),
                None => format!("{:#}", e),
            };
            eprintln!("{}: {}", "Error".red().bold(), message);
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the difference threshold was exceeded
fn run(cli: Cli) -> anyhow::Result<bool> {
    let verifier = VerifierBuilder::new()
        .verbose(cli.verbose)
        .machine_readable(cli.machine)
        .follow_symlinks(cli.follow)
        .one_filesystem(cli.one_filesystem)
        .count_unmatched(!cli.no_count)
        .ignore_dirs(cli.ignore)
        .sample_count(cli.samples)
        .sample_width(cli.sample_width)
        .parallel_workers(cli.jobs)
        .build(&cli.original, &cli.backup)
        .with_context(|| {
            format!(
                "cannot verify {} against {}",
                cli.backup.display(),
                cli.original.display()
            )
        })?;

    let progress = if cli.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .context("invalid progress template")?,
        );
        pb.set_message("Comparing...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let sink = TerminalSink {
        progress: progress.clone(),
        to_stderr: cli.json || cli.machine,
    };
    let report = verifier
        .verify_with_sink(&sink)
        .context("verification aborted")?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if cli.json {
        println!("{}", report.to_json()?);
    } else if cli.machine {
        println!("{}", report.render_machine());
    } else {
        print_human(&report);
    }

    Ok(match cli.max_diff_percent {
        Some(max) => !report.exceeds(max),
        None => true,
    })
}

fn print_human(report: &VerificationReport) {
    println!("\n{}", "Verification Report:".bold());
    for line in report.render_human().lines() {
        println!("  {}", line);
    }

    let percent = report.summary.diff_percent();
    let verdict = format!("{:.2}% of the original differs in the backup", percent);
    if report.summary.diff_count == 0 {
        println!("\n{} {}", "✓".green().bold(), verdict.green());
    } else {
        println!("\n{} {}", "✗".red().bold(), verdict.yellow());
    }
}

/// Prints per-item lines, keeping them clear of the spinner
struct TerminalSink {
    progress: Option<ProgressBar>,
    to_stderr: bool,
}

impl ReportSink for TerminalSink {
    fn report(&self, item: &ItemReport) {
        let prefix = match item.prefix {
            LogPrefix::Error => item.prefix.as_str().red().bold(),
            LogPrefix::Dir | LogPrefix::File | LogPrefix::SymMis => {
                item.prefix.as_str().yellow()
            }
            LogPrefix::Debug => item.prefix.as_str().dimmed(),
            _ => item.prefix.as_str().cyan(),
        };
        let mut line = format!("{}: {}", prefix, item.path.display());
        if !item.detail.is_empty() {
            line.push_str(&format!(" ({})", item.detail));
        }

        let print = || {
            if self.to_stderr || item.prefix == LogPrefix::Error {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        };
        match &self.progress {
            Some(pb) => {
                pb.suspend(print);
                pb.set_message(format!("Comparing... {}", item.path.display()));
            }
            None => print(),
        }
    }
}
