mod fixture;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use regex::Regex;

use fixture::{Fixture, Outcome};

/// replay definition fixtures and compare every call against its expectation
#[derive(Parser, Debug)]
struct Args {
    /// fixture files
    #[arg(num_args = 1.., required = true)]
    fixtures: Vec<PathBuf>,

    /// only run cases whose `unit/call #n` label matches this regex
    #[arg(long)]
    filter: Option<String>,
}

fn run(args: &Args) -> Result<bool> {
    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --filter regex")?;
    let keep = |label: &str| filter.as_ref().is_none_or(|re| re.is_match(label));

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in &args.fixtures {
        let fixture = Fixture::load(path)?;
        eprintln!("{} {}", "——".dimmed(), path.display());
        for report in fixture.run(keep) {
            match report.outcome {
                Outcome::Pass => {
                    passed += 1;
                    eprintln!("{} {}", "✅".green(), report.label);
                }
                Outcome::Fail(why) => {
                    failed += 1;
                    eprintln!("{} {} {}", "❌".red(), report.label.bold(), why);
                }
            }
        }
    }
    eprintln!("{passed} passed, {failed} failed");
    Ok(failed == 0)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}
