//! Report command - summarize a store directory without touching it

use crate::cache::{format_bytes, summarize, DirSummary, LocalFs, ReportLimits};
use crate::cli::args::{OutputFormat, ReportArgs};
use crate::error::{PersistError, PersistResult};
use console::style;
use std::io;
use std::path::Path;

/// Execute the report command
pub async fn execute(args: ReportArgs, verbose: bool) -> PersistResult<()> {
    let limits = ReportLimits::for_detail(verbose, args.trace);
    let summary = summarize(&LocalFs::new(), &args.path, limits)
        .await
        .ok_or_else(|| {
            PersistError::io(
                format!("summarizing {}", args.path.display()),
                io::ErrorKind::NotFound.into(),
            )
        })?;

    match args.format {
        OutputFormat::Table => print_table(&args.path, &summary, args.trace),
        OutputFormat::Json => print_json(&args.path, &summary)?,
        OutputFormat::Plain => {
            for line in &summary.sample {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn print_table(path: &Path, summary: &DirSummary, trace: bool) {
    println!("{} {}", style("Report:").bold().cyan(), path.display());
    println!();
    println!(
        "  files={}  dirs={}  links={}  total={}",
        summary.files,
        summary.dirs,
        summary.links,
        summary.total()
    );
    println!("  approx size: {}", format_bytes(summary.bytes));
    println!();

    if summary.sample.is_empty() {
        println!("  {}", style("<empty>").dim());
        return;
    }
    for line in &summary.sample {
        println!("  {}", line);
    }
    if !trace {
        println!();
        println!("{}", style("(use --trace for a deeper listing)").dim());
    }
}

fn print_json(path: &Path, summary: &DirSummary) -> PersistResult<()> {
    #[derive(serde::Serialize)]
    struct ReportJson<'a> {
        root: String,
        total: u64,
        #[serde(flatten)]
        summary: &'a DirSummary,
    }

    let report = ReportJson {
        root: path.display().to_string(),
        total: summary.total(),
        summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
