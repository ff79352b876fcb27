use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use bus::CoreEvent;

use crate::router::Router;

/// Feeds transport events to `router` until it settles or `timeout` passes. Returns
/// whether it settled.
pub fn run_until_settled(router: &mut Router, events: &Receiver<CoreEvent>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !router.is_settled() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(evt) => router.handle_core_event(evt),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(target: "router", "not settled after {timeout:?}: {:?}", router.get_state().status());
                return false;
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!(target: "router", "transport gone before settling");
                return false;
            }
        }
    }
    true
}

/// Handles every event already queued without blocking. Returns how many were handled.
pub fn drain_ready(router: &mut Router, events: &Receiver<CoreEvent>) -> usize {
    let mut handled = 0;
    while let Ok(evt) = events.try_recv() {
        router.handle_core_event(evt);
        handled += 1;
    }
    handled
}
