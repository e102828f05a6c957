//! Version information display.

use std::time::Duration;

use serde_json::json;

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::transition::{COVER_DURATION, FRAME_INTERVAL};

/// Print version and build information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
            println!(
                "defaults: cover {}ms, frame {}ms",
                millis(COVER_DURATION),
                millis(FRAME_INTERVAL)
            );
        }
        OutputFormat::Json => {
            let info = json!({
                "name": name,
                "version": version,
                "cover_duration_ms": millis(COVER_DURATION),
                "frame_interval_ms": millis(FRAME_INTERVAL),
            });
            println!("{info}");
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
