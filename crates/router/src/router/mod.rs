//! Router orchestration.
//!
//! Invariants:
//! - The router owns every piece of navigation state (store, prefetch cache, executed
//!   script set, live page, history). Nothing is global; routers are independent.
//! - Every outgoing request is recorded in `in_flight` under its request id until the
//!   transport reports back. Transport events for unknown ids are stale and dropped.
//! - A navigation completion may only reset state to idle while the state still carries
//!   that navigation's location key and cancel token; a submission completion only while
//!   the state still carries its submission key.

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use bus::{CoreCommand, CoreEvent};
use core_types::{RequestId, ResourceKind};
use net::HttpRequest;

use crate::cancel::CancelToken;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::history::{History, LocationKey, MemoryHistory};
use crate::page::PageState;
use crate::prefetch::{FetchOutcome, PrefetchCache};
use crate::reconcile::{MorphReconciler, Reconciler};
use crate::scripts::{LoggingExecutor, ScriptExecutor, ScriptReplayer};
use crate::state::{RouterState, StateStore, SubmissionKey, Subscription};

mod nav;
mod submit;

#[derive(Debug)]
enum Pending {
    Navigation { key: LocationKey, cancel: CancelToken },
    Submission { key: SubmissionKey, cancel: CancelToken },
    Prefetch,
}

pub struct Router {
    config: RouterConfig,
    cmd_tx: Sender<CoreCommand>,

    store: StateStore,
    prefetch: PrefetchCache,
    scripts: ScriptReplayer,
    page: PageState,

    history: Box<dyn History>,
    reconciler: Box<dyn Reconciler>,
    executor: Box<dyn ScriptExecutor>,

    in_flight: HashMap<RequestId, Pending>,
    next_request_id: RequestId,
    active: bool,
}

impl Router {
    pub fn new(page: PageState, cmd_tx: Sender<CoreCommand>, config: RouterConfig) -> Self {
        let history = MemoryHistory::new(page.url.clone());
        Self {
            config,
            cmd_tx,
            store: StateStore::new(),
            prefetch: PrefetchCache::new(),
            scripts: ScriptReplayer::new(),
            page,
            history: Box::new(history),
            reconciler: Box::new(MorphReconciler),
            executor: Box::new(LoggingExecutor),
            in_flight: HashMap::new(),
            next_request_id: 0,
            active: false,
        }
    }

    // -- Setup Methods ---
    pub fn with_history(mut self, history: impl History + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_reconciler(mut self, reconciler: impl Reconciler + 'static) -> Self {
        self.reconciler = Box::new(reconciler);
        self
    }

    pub fn with_executor(mut self, executor: impl ScriptExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Starts delegating events. Scripts already on the page count as executed.
    pub fn init(&mut self) {
        if self.active {
            return;
        }
        self.scripts.seed(&self.page);
        self.active = true;
        log::debug!(target: "router", "init at {}", self.page.url);
    }

    /// Stops delegating, cancels everything in flight and forgets pending requests. Until
    /// the next `init`, every entry point is a no-op.
    pub fn dispose(&mut self) {
        if !self.active {
            return;
        }
        self.cancel_active();
        self.prefetch.clear();
        for (_, pending) in self.in_flight.drain() {
            match pending {
                Pending::Navigation { cancel, .. } | Pending::Submission { cancel, .. } => {
                    cancel.cancel()
                }
                Pending::Prefetch => {}
            }
        }
        if !self.store.get().is_idle() {
            self.store.set(RouterState::Idle);
        }
        self.active = false;
        log::debug!(target: "router", "disposed");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // -- Accessors ---
    pub fn get_state(&self) -> &RouterState {
        self.store.get()
    }

    pub fn subscribe(&self, callback: impl FnMut(&RouterState) + 'static) -> Subscription {
        self.store.subscribe(callback)
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn history(&self) -> &dyn History {
        self.history.as_ref()
    }

    pub fn prefetch_cache(&self) -> &PrefetchCache {
        &self.prefetch
    }

    pub fn scripts(&self) -> &ScriptReplayer {
        &self.scripts
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Idle with no navigation or submission response outstanding. Prefetches do not
    /// count.
    pub fn is_settled(&self) -> bool {
        self.store.get().is_idle()
            && !self
                .in_flight
                .values()
                .any(|p| !matches!(p, Pending::Prefetch))
    }

    // -- Event Handling ---
    pub fn handle_core_event(&mut self, evt: CoreEvent) {
        let request_id = evt.request_id();
        let outcome: FetchOutcome = match evt {
            CoreEvent::NetworkDone { response, .. } => Ok(response),
            CoreEvent::NetworkError {
                cancelled: true, ..
            } => Err(RouterError::Aborted),
            CoreEvent::NetworkError { url, error, .. } => {
                Err(RouterError::Network(format!("{url}: {error}")))
            }
        };

        match self.in_flight.remove(&request_id) {
            Some(Pending::Navigation { key, cancel }) => {
                self.finish_navigation(key, cancel, outcome)
            }
            Some(Pending::Submission { key, cancel }) => {
                self.finish_submission(key, cancel, outcome)
            }
            Some(Pending::Prefetch) => {
                if !self.prefetch.complete(request_id, outcome) {
                    log::trace!(target: "router.prefetch", "dropping orphaned prefetch #{request_id}");
                }
            }
            None => log::trace!(target: "router", "stale event for #{request_id}"),
        }
    }

    // -- Internal Helpers ---
    fn cancel_active(&mut self) {
        if let Some(cancel) = self.store.get().cancel_token() {
            cancel.cancel();
        }
    }

    fn mint_token(&mut self) -> CancelToken {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        CancelToken::new(self.next_request_id, self.cmd_tx.clone())
    }

    fn send_fetch(&self, request_id: RequestId, kind: ResourceKind, request: HttpRequest) {
        log::trace!(target: "router", "fetch #{request_id} {} {} {}", kind.as_str(), request.method, request.url);
        let _ = self.cmd_tx.send(CoreCommand::Fetch {
            request_id,
            kind,
            request,
        });
    }
}
