//! Scripted session runner.

use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{OutputFormat, SimulateArgs};
use crate::config::ConfigLoader;
use crate::error::PageshiftError;
use crate::observability::EventEmitter;
use crate::session::{RunSummary, Session};

/// Load a site file, run its scenario and print the summary.
///
/// # Errors
///
/// Returns an error if the site file fails to load, the event file
/// cannot be created, or a scenario step is malformed.
pub async fn run(args: &SimulateArgs) -> Result<(), PageshiftError> {
    let loaded = ConfigLoader::default().load(&args.config)?;
    for warning in &loaded.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let events = Arc::new(open_events(args.events.as_deref())?);
    let session = Session::new(loaded.config, Arc::clone(&events))?;
    tracing::info!(session = session.id(), config = %args.config.display(), "running scenario");

    let summary = session.run().await?;

    match args.format {
        OutputFormat::Human => print_human(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn open_events(path: Option<&Path>) -> Result<EventEmitter, PageshiftError> {
    match path {
        None => Ok(EventEmitter::noop()),
        Some(p) if p == Path::new("-") => Ok(EventEmitter::stderr()),
        Some(p) => Ok(EventEmitter::from_file(p)?),
    }
}

fn print_human(summary: &RunSummary) {
    println!(
        "session {} on '{}': {} steps in {}ms",
        summary.session_id, summary.site, summary.steps, summary.duration_ms
    );

    if summary.timeline.is_empty() {
        println!("timeline: no transitions");
    } else {
        println!("timeline:");
        for entry in &summary.timeline {
            println!(
                "  {:>7}ms  {} -> {} ({})",
                entry.elapsed_ms, entry.from, entry.to, entry.cause
            );
        }
    }

    let navigations: Vec<_> = summary.navigations.iter().map(ToString::to_string).collect();
    println!(
        "navigations: {}",
        if navigations.is_empty() {
            "none".to_string()
        } else {
            navigations.join(", ")
        }
    );
    println!("scroll resets: {}", summary.scroll_resets);
    println!(
        "clicks: {} accepted, {} rejected",
        summary.accepted_clicks, summary.rejected_clicks
    );
    for click in summary.clicks.iter().filter(|c| !c.accepted()) {
        println!("  step {}: {} -> {}", click.step, click.href, click.outcome);
    }
    println!(
        "final: {} at {} (gate {}, menu {})",
        summary.final_phase,
        summary.final_path,
        summary.gate,
        if summary.menu_open { "open" } else { "closed" }
    );
}
