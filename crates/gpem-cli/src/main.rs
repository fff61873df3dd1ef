use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::bail;
use clap::{Parser, Subcommand};
use gpem_core::{CancellationToken, Fixture, MatchError, MatchOptions, MergeOptions, ProcessControl};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpem", version, about = "Google Photos Takeout sidecar matcher - pair media with JSON metadata and merge it back")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Sidecar basenames longer than this were truncated by the exporter
    #[arg(long, global = true, default_value_t = gpem_core::recovery::TRUNCATION_CUTOFF)]
    truncation_cutoff: usize,

    /// More output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Match media files in a folder with their sidecars and report the result
    Match {
        /// Folder exported by Takeout (one level, no recursion)
        dir: PathBuf,

        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Save the run as a regression fixture in this folder
        #[arg(long)]
        save_fixture: Option<PathBuf>,
    },

    /// Copy media to an output folder and write sidecar metadata into the copies
    Merge {
        /// Folder exported by Takeout
        input: PathBuf,

        /// Output folder
        #[arg(short, long)]
        output: PathBuf,

        /// Only report what would be done
        #[arg(long)]
        dry_run: bool,

        /// Replace files already in the output folder
        #[arg(long)]
        overwrite: bool,

        /// exiftool executable
        #[arg(long, default_value = "exiftool")]
        exiftool: PathBuf,
    },

    /// Re-run saved fixtures and compare with their recorded results
    Replay {
        #[arg(required = true)]
        fixtures: Vec<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status for matcher defects, kept apart from ordinary failures
const EXIT_MATCHER_DEFECT: u8 = 2;

fn is_matcher_defect(err: &anyhow::Error) -> bool {
    err.downcast_ref::<MatchError>()
        .is_some_and(MatchError::is_invariant_violation)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_matcher_defect(&e) => {
            eprintln!("Matcher defect, please report it with the folder listing: {:#}", e);
            ExitCode::from(EXIT_MATCHER_DEFECT)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let t_total = std::time::Instant::now();

    let matching = MatchOptions {
        truncation_cutoff: cli.truncation_cutoff,
        ..MatchOptions::default()
    };

    match cli.command {
        Command::Match {
            dir,
            json,
            save_fixture,
        } => {
            let result = gpem_core::find_sidecar_files(&dir, &matching, save_fixture.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            let s = result.summary();
            eprintln!(
                "Done! {} media files: {} matched, {} missing, {} ambiguous ({:.2}s)",
                result.total(),
                s.matched_files_length,
                s.missing_files_length,
                s.ambiguous_files_length,
                t_total.elapsed().as_secs_f64()
            );
        }

        Command::Merge {
            input,
            output,
            dry_run,
            overwrite,
            exiftool,
        } => {
            let options = MergeOptions {
                input_dir: input,
                output_dir: output,
                dry_run,
                overwrite,
                exiftool,
                matching,
            };

            let token = CancellationToken::new();
            let handler_token = token.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nCancelling after the current file...");
                handler_token.cancel();
            })?;
            let control = ProcessControl::new().with_cancel_token(token);

            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}") {
                pb.set_style(style);
            }
            let bar = pb.clone();
            let result = gpem_core::merge_metadata(&options, &control, &move |_stage, current, total, message| {
                bar.set_length(total);
                bar.set_position(current + 1);
                bar.set_message(message.to_string());
            })?;
            pb.finish_and_clear();

            for w in &result.warnings {
                warn!("{}", w);
            }
            eprintln!(
                "Done! {} media files, {} matched, {} written, {} tagged, {} skipped ({:.2}s)",
                result.total_media,
                result.matched,
                result.files_written,
                result.files_tagged,
                result.files_skipped,
                t_total.elapsed().as_secs_f64()
            );
        }

        Command::Replay { fixtures } => {
            let mut failed = 0;
            for dir in &fixtures {
                let report = Fixture::load(dir)?.replay(&matching)?;
                if report.passed() {
                    info!("{}: ok", dir.display());
                    continue;
                }
                failed += 1;
                warn!(
                    "{}: expected {:?}, got {:?}",
                    dir.display(),
                    report.expected,
                    report.actual
                );
                for r in &report.lost {
                    warn!("  lost   {} -> {}", r.media, r.sidecar);
                }
                for r in &report.gained {
                    warn!("  gained {} -> {}", r.media, r.sidecar);
                }
            }
            if failed > 0 {
                bail!("{} of {} fixtures failed", failed, fixtures.len());
            }
            eprintln!("All {} fixtures passed", fixtures.len());
        }
    }

    Ok(())
}
