//! Metrics for the transition coordinator.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder; without one every call is a
//! no-op. Label values are drawn from closed enums only, so cardinality is
//! bounded by construction.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::transition::{RejectReason, TransitionPhase};

/// Registers metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "pageshift_transitions_started_total",
        "Navigation requests accepted by the coordinator"
    );
    describe_counter!(
        "pageshift_transitions_rejected_total",
        "Navigation requests ignored, by reason"
    );
    describe_counter!(
        "pageshift_transitions_completed_total",
        "Transitions that returned to idle"
    );
    describe_counter!(
        "pageshift_phase_changes_total",
        "Phase changes by source and target phase"
    );
    describe_histogram!(
        "pageshift_transition_duration_ms",
        "Time from request to idle in milliseconds"
    );
    describe_gauge!(
        "pageshift_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!(
        "pageshift_link_clicks_total",
        "Link clicks by interception decision"
    );
}

/// Records an accepted navigation request.
pub fn record_transition_started() {
    counter!("pageshift_transitions_started_total").increment(1);
}

/// Records an ignored navigation request.
pub fn record_transition_rejected(reason: RejectReason) {
    counter!("pageshift_transitions_rejected_total", "reason" => reason.as_str()).increment(1);
}

/// Records a completed transition and its wall-clock duration.
pub fn record_transition_completed(duration: Duration) {
    counter!("pageshift_transitions_completed_total").increment(1);
    histogram!("pageshift_transition_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Records a phase change and moves the current-phase gauge.
pub fn record_phase_change(from: TransitionPhase, to: TransitionPhase) {
    counter!(
        "pageshift_phase_changes_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("pageshift_current_phase", "phase" => from.as_str()).set(0.0);
    gauge!("pageshift_current_phase", "phase" => to.as_str()).set(1.0);
}

/// Records a link click and whether it was intercepted.
pub fn record_link_click(decision: &'static str) {
    counter!("pageshift_link_clicks_total", "decision" => decision).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        describe_metrics();
        record_transition_started();
        record_transition_rejected(RejectReason::InFlight);
        record_transition_rejected(RejectReason::SamePath);
        record_phase_change(TransitionPhase::Idle, TransitionPhase::Covering);
        record_transition_completed(Duration::from_millis(1040));
        record_link_click("intercepted");
    }
}
