//! Mermaid rendering of the transition state machine.

use std::fmt::Write as _;

use crate::cli::args::DiagramArgs;
use crate::error::PageshiftError;
use crate::transition::{TransitionPhase, TransitionTimings};

/// Print the state diagram, or write it to `--output`.
///
/// # Errors
///
/// Returns an I/O error if the output file cannot be written.
pub fn run(args: &DiagramArgs) -> Result<(), PageshiftError> {
    let diagram = render(TransitionTimings::default());
    match &args.output {
        Some(path) => {
            std::fs::write(path, &diagram)?;
            tracing::info!(path = %path.display(), "diagram written");
        }
        None => print!("{diagram}"),
    }
    Ok(())
}

/// Renders the four-phase cycle as a `stateDiagram-v2`.
#[must_use]
pub fn render(timings: TransitionTimings) -> String {
    let mut out = String::from("stateDiagram-v2\n");
    let _ = writeln!(out, "    [*] --> {}", TransitionPhase::Idle);
    for phase in TransitionPhase::ALL {
        let label = match phase {
            TransitionPhase::Idle => "start_transition(dest), dest != current".to_string(),
            TransitionPhase::Covering => format!(
                "cover elapsed ({}ms), scroll to top, navigate",
                timings.cover_duration.as_millis()
            ),
            TransitionPhase::Covered => format!(
                "route changed + one frame ({}ms)",
                timings.frame_interval.as_millis()
            ),
            TransitionPhase::Revealing => "reveal animation finished".to_string(),
        };
        let _ = writeln!(out, "    {} --> {}: {label}", phase, phase.next());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default() {
        let diagram = render(TransitionTimings::default());
        let lines: Vec<_> = diagram.lines().collect();
        assert_eq!(lines[0], "stateDiagram-v2");
        assert_eq!(lines[1], "    [*] --> idle");
        assert!(lines[2].starts_with("    idle --> covering: "));
        assert!(lines[3].contains("covering --> covered: cover elapsed (500ms)"));
        assert!(lines[4].contains("covered --> revealing: route changed + one frame (16ms)"));
        assert!(lines[5].starts_with("    revealing --> idle: "));
        assert_eq!(lines.len(), 6);
    }
}
