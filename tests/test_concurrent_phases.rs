mod common;

use std::sync::Arc;
use std::time::Duration;

use common::path;
use pageshift::route::RoutePath;
use pageshift::router::{MemoryRouter, Router};
use pageshift::transition::{TransitionCoordinator, TransitionPhase, TransitionTimings};
use pageshift::viewport::{MemoryViewport, Viewport};
use tokio::sync::watch;

const ROUNDS: usize = 200;

fn other_page(current: &RoutePath) -> RoutePath {
    if current.is_root() {
        path("/about")
    } else {
        path("/")
    }
}

async fn wait_for(rx: &mut watch::Receiver<TransitionPhase>, phase: TransitionPhase) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| *p == phase))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {phase}"))
        .map(|_| ())
        .expect("coordinator dropped");
}

/// Reveal completion and a new request race on separate threads; every
/// subscriber must still see the changes in the order the state made them.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reveal_and_request_publish_in_state_order() {
    let router = Arc::new(MemoryRouter::new(path("/")));
    let viewport = Arc::new(MemoryViewport::new());
    let coordinator = Arc::new(
        TransitionCoordinator::new(
            Arc::clone(&router) as Arc<dyn Router>,
            viewport as Arc<dyn Viewport>,
        )
        .with_timings(TransitionTimings {
            cover_duration: Duration::ZERO,
            frame_interval: Duration::ZERO,
        }),
    );
    let mut transitions = coordinator.subscribe_transitions();
    let mut phases = coordinator.subscribe();
    let watcher = coordinator.attach();

    let mut last = TransitionPhase::Idle;
    let mut seen = 0;

    for round in 0..ROUNDS {
        if coordinator.phase() == TransitionPhase::Idle {
            coordinator.start_transition(&other_page(&router.current_path()));
        }
        wait_for(&mut phases, TransitionPhase::Revealing).await;

        let next = other_page(&router.current_path());
        let finisher = Arc::clone(&coordinator);
        let starter = Arc::clone(&coordinator);
        let (a, b) = tokio::join!(
            tokio::task::spawn_blocking(move || finisher.on_reveal_animation_complete()),
            tokio::task::spawn_blocking(move || starter.start_transition(&next)),
        );
        a.unwrap();
        b.unwrap();

        while let Ok(t) = transitions.try_recv() {
            assert_eq!(t.from, last, "round {round}: {t:?} does not follow {last}");
            last = t.to;
            seen += 1;
        }
    }

    // Let any in-flight transition settle, then finish it
    if coordinator.phase() != TransitionPhase::Idle {
        wait_for(&mut phases, TransitionPhase::Revealing).await;
        coordinator.on_reveal_animation_complete();
    }
    while let Ok(t) = transitions.try_recv() {
        assert_eq!(t.from, last);
        last = t.to;
        seen += 1;
    }

    assert!(seen >= ROUNDS * 2, "only {seen} phase changes observed");
    assert_eq!(last, TransitionPhase::Idle);
    assert_eq!(*phases.borrow(), TransitionPhase::Idle);
    assert_eq!(coordinator.phase(), TransitionPhase::Idle);

    coordinator.shutdown();
    watcher.await.unwrap();
}
