//! Command implementations for the OpenAQ processor CLI
//!
//! Each subcommand builds its configuration from the parsed arguments, runs
//! the matching library stage and reports a summary.

use crate::archive::{ArchiveFetcher, ArchiveSubsetter};
use crate::cli::args::{Args, Commands, ConvertArgs, FetchArgs, SubsetArgs};
use crate::config::date_range;
use crate::processor::DayRangeProcessor;
use anyhow::{Context, Result};
use colored::*;
use indicatif::HumanDuration;
use std::time::Instant;
use tracing::{debug, info};

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    let show_progress = args.show_progress();
    match args.command {
        Some(Commands::Convert(convert)) => run_convert(&convert, show_progress),
        Some(Commands::Subset(subset)) => run_subset(&subset),
        Some(Commands::Fetch(fetch)) => run_fetch(&fetch),
        None => Ok(()),
    }
}

/// Grid one pollutant over the requested days
fn run_convert(args: &ConvertArgs, show_progress: bool) -> Result<()> {
    let config = args
        .to_config()
        .context("Invalid convert arguments")?;
    info!(
        "Converting {} from {} to {} on {}",
        config.parameter, config.start_date, config.end_date, config.grid_name
    );

    let processor = DayRangeProcessor::new(config.clone()).with_context(|| {
        format!(
            "Failed to load grid {} from {}",
            config.grid_name,
            config.griddesc_path.display()
        )
    })?;
    processor
        .with_progress(show_progress)
        .process()
        .context("Conversion failed")?;

    Ok(())
}

/// Split mirrored archive days into the per-parameter ndjson tree
fn run_subset(args: &SubsetArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = args.to_config().context("Invalid subset arguments")?;
    let subsetter = ArchiveSubsetter::new(&config, args.parameter.clone());

    let dates = date_range(args.start_date, args.end_date);
    let stats = subsetter
        .subset_range(&dates)
        .with_context(|| format!("Failed to subset {}", config.archive_root.display()))?;

    println!("\n{}", "Subset Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(start_time.elapsed())
    );
    println!(
        "  {} {}",
        "Archives read:".bright_cyan(),
        stats.archives_read.to_string().bright_white()
    );
    println!(
        "  {} {} of {}",
        "Lines kept:".bright_cyan(),
        stats.lines_kept.to_string().bright_white().bold(),
        stats.lines_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files written:".bright_cyan(),
        stats.files_written.to_string().bright_white().bold()
    );

    Ok(())
}

/// Mirror archive days from the bucket
fn run_fetch(args: &FetchArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = args.to_config().context("Invalid fetch arguments")?;
    let fetcher = ArchiveFetcher::new(&config).context("Failed to create HTTP client")?;

    let dates = date_range(args.start_date, args.end_date);
    let stats = fetcher
        .fetch_range(&dates)
        .with_context(|| format!("Failed to fetch from {}", config.bucket))?;

    println!("\n{}", "Fetch Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(start_time.elapsed())
    );
    println!(
        "  {} {} downloaded, {} cached",
        "Listings:".bright_cyan(),
        stats.listings_downloaded.to_string().bright_white(),
        stats.listings_cached.to_string().bright_white()
    );
    println!(
        "  {} {} downloaded ({} bytes), {} cached",
        "Files:".bright_cyan(),
        stats.files_downloaded.to_string().bright_white().bold(),
        stats.bytes_downloaded,
        stats.files_cached.to_string().bright_white()
    );

    Ok(())
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("openaq_processor={}", log_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init();

    debug!("Logging initialized at level: {}", log_level);
}
