//! # livescope - Main Entry Point
//!
//! Replays a capture file into a fresh `CaptureData` on background threads
//! while the live functions view re-sorts on a fixed tick, then prints the
//! resulting table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use livescope::capture::{CaptureData, MinMax};
use livescope::cli::Args;
use livescope::domain::{self, FunctionAddress, ReplayError};
use livescope::replay::{CaptureFile, Replay, ReplayOptions};
use livescope::view::{LiveColumn, LiveFunctionsView};
use log::{info, warn};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// Malformed capture files are a usage problem; everything else is an error.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ReplayError>() {
        Some(ReplayError::Io(_)) | None => EXIT_ERROR,
        Some(_) => EXIT_USAGE,
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let capture = CaptureFile::from_file(&args.capture)
        .with_context(|| format!("Failed to load capture {}", args.capture.display()))?;

    if !quiet {
        println!("livescope v{}", env!("CARGO_PKG_VERSION"));
        println!("capture: {}", args.capture.display());
        println!("pid: {}", capture.session.process_id);
        println!("functions: {}", capture.session.functions.len());
        println!("events: {} ({} timers)", capture.events.len(), capture.timer_count());
    }

    let CaptureFile { session, events } = capture;
    let data = Arc::new(CaptureData::new(session, args.capture_config()));

    let mut view = LiveFunctionsView::new();
    view.on_capture_started(Arc::clone(&data));
    if !args.filter.is_empty() {
        view.set_filter(&args.filter);
    }
    view.set_sort(args.sort, args.sort_order());

    let replay = Replay::start(events, Arc::clone(&data), ReplayOptions { speed: args.speed });

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };
    let mut ticker = tokio::time::interval(args.refresh_period());

    let exit_reason = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                replay.stop();
                break "interrupted";
            }
        }

        // Checked before the re-sort so the last tick sees every event.
        let finished = replay.is_finished();
        view.on_timer();
        if args.headless {
            print_table(&view, args.top);
        }

        if finished {
            break "capture exhausted";
        }
        if duration_limit.is_some_and(|limit| started.elapsed() >= limit) {
            replay.stop();
            break "duration limit reached";
        }
    };

    let summary = replay.join()?;
    view.on_timer();

    if !quiet {
        eprintln!(
            "\n{}: {:.1}s, {} events sent, {} ingested, {} timers rejected, {} threads",
            exit_reason,
            started.elapsed().as_secs_f64(),
            summary.events_sent,
            summary.events_ingested,
            summary.timers_rejected,
            data.timer_chains().len(),
        );
    }
    if let Some(err) = &summary.fatal {
        warn!("Capture ended early: {err}");
    }

    print_table(&view, args.top);

    if let Some(name) = &args.min_max {
        print_min_max(&data, name);
    }

    if summary.fatal.is_some() {
        anyhow::bail!("Capture aborted after {} events", summary.events_ingested);
    }
    Ok(())
}

fn print_table(view: &LiveFunctionsView, top: usize) {
    let (column, order) = view.sorting();
    let filter = if view.filter().is_empty() {
        String::new()
    } else {
        format!(", filter \"{}\"", view.filter())
    };
    println!("\n{} functions, sorted by {column} {order:?}{filter}", view.len());
    println!(
        "{:<40} {:>10} {:>14} {:>14} {:>14} {:>14} {:>18}",
        "Function", "Count", "Total", "Avg", "Min", "Max", "Address"
    );

    for row in 0..view.len().min(top) {
        let cell = |column| view.value(row, column);
        println!(
            "{:<40} {:>10} {:>14} {:>14} {:>14} {:>14} {:>18}",
            truncate(&cell(LiveColumn::Name), 40),
            cell(LiveColumn::Count),
            cell(LiveColumn::Total),
            cell(LiveColumn::Average),
            cell(LiveColumn::Min),
            cell(LiveColumn::Max),
            cell(LiveColumn::Address),
        );
    }
}

fn print_min_max(data: &CaptureData, name: &str) {
    let Some(function) =
        data.selected_functions().iter().find(|f| f.display_name() == name || f.name == name)
    else {
        warn!("No selected function named \"{name}\"");
        return;
    };
    let address = data.absolute_address(function);
    info!("Scanning timer chains for {name} at {}", FunctionAddress(address));

    match data.find_extreme_duration_records(address) {
        Some(MinMax { min, max }) => {
            for (label, call) in [("fastest", min), ("slowest", max)] {
                println!(
                    "{label}: {} on {} at {} ns (block {}, slot {})",
                    domain::Duration(call.duration_ns()),
                    call.location.tid,
                    call.timer.start_ns,
                    call.location.block,
                    call.location.index,
                );
            }
        }
        None => println!("{name}: no recorded calls"),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
