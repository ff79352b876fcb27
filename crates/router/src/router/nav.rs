use core_types::ResourceKind;
use html::parse_document;
use net::{HttpRequest, HttpResponse};
use url::Url;

use super::{Pending, Router};
use crate::cancel::CancelToken;
use crate::error::RouterError;
use crate::history::{Location, LocationKey};
use crate::prefetch::FetchOutcome;
use crate::reconcile::{ReconcileStats, patch_document};
use crate::state::{Navigation, RouterState};

impl Router {
    // -- Navigation Methods ---
    /// Resolves `href` against the page, pushes it onto history and navigates there.
    pub fn navigate(&mut self, href: &str) -> Result<(), RouterError> {
        if !self.is_active() {
            return Err(RouterError::Inactive);
        }
        let url = self
            .page
            .resolve(href)
            .map_err(|e| RouterError::malformed(href, e))?;
        self.push_location(url);
        Ok(())
    }

    pub fn go(&mut self, delta: isize) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.history.go(delta) {
            Some(location) => {
                self.handle_location_change(location);
                true
            }
            None => false,
        }
    }

    pub fn back(&mut self) -> bool {
        self.go(-1)
    }

    pub fn forward(&mut self) -> bool {
        self.go(1)
    }

    /// Starts a prefetch of `url` if the router is active, prefetching is enabled and the
    /// cache accepts it.
    pub fn prefetch(&mut self, url: &Url) -> bool {
        if !self.is_active() || !self.config.prefetch.enabled {
            return false;
        }
        let request_id = self.next_request_id.wrapping_add(1);
        let cmd_tx = self.cmd_tx.clone();
        let mut issued = None;
        self.prefetch.trigger(url, &self.page.url, |target| {
            issued = Some(target.clone());
            CancelToken::new(request_id, cmd_tx)
        });

        match issued {
            Some(target) => {
                self.next_request_id = request_id;
                self.in_flight.insert(request_id, Pending::Prefetch);
                self.send_fetch(request_id, ResourceKind::Prefetch, HttpRequest::get(target.as_str()));
                true
            }
            None => false,
        }
    }

    pub(crate) fn push_location(&mut self, url: Url) {
        let location = self.history.push(url);
        self.handle_location_change(location);
    }

    /// History listener: runs the navigation pipeline for `location`.
    pub fn handle_location_change(&mut self, location: Location) {
        if !self.is_active() {
            log::debug!(target: "router.nav", "inactive; ignoring location {}", location.url);
            return;
        }
        self.cancel_active();

        let url = location.url.clone();
        let key = location.key;
        let same_origin = url.origin() == self.page.origin();
        if same_origin {
            self.page.url = url.clone();
        }
        log::debug!(target: "router.nav", "navigate {key} -> {url}");

        // Any committed history change drops the cache; a matching entry is adopted first.
        let adopted = self.prefetch.take(&url);
        self.prefetch.clear();

        let mut request = None;
        let (cancel, ready) = match adopted {
            Some(entry) => {
                log::debug!(target: "router.nav", "adopting prefetch #{} for {url}", entry.request_id);
                if entry.is_pending() {
                    self.in_flight.insert(
                        entry.request_id,
                        Pending::Navigation {
                            key,
                            cancel: entry.cancel.clone(),
                        },
                    );
                }
                (entry.cancel, entry.response)
            }
            None if !same_origin => (
                self.mint_token(),
                Some(Err(RouterError::CrossOrigin(url.to_string()))),
            ),
            None => {
                let cancel = self.mint_token();
                self.in_flight.insert(
                    cancel.request_id(),
                    Pending::Navigation {
                        key,
                        cancel: cancel.clone(),
                    },
                );
                let mut wire_url = url.clone();
                wire_url.set_fragment(None);
                request = Some(HttpRequest::get(wire_url.as_str()));
                (cancel, None)
            }
        };

        self.store.set(RouterState::Navigating {
            navigation: Navigation { location },
            cancel: cancel.clone(),
        });

        if let Some(request) = request {
            self.send_fetch(cancel.request_id(), ResourceKind::Navigation, request);
        }
        if let Some(outcome) = ready {
            self.finish_navigation(key, cancel, outcome);
        }
    }

    pub(crate) fn finish_navigation(
        &mut self,
        key: LocationKey,
        cancel: CancelToken,
        outcome: FetchOutcome,
    ) {
        let outcome = if cancel.is_cancelled() {
            Err(RouterError::Aborted)
        } else {
            outcome
        };

        match outcome.and_then(|response| self.render(response)) {
            Ok(stats) => log::debug!(target: "router.nav", "rendered {key}: {stats:?}"),
            Err(RouterError::Aborted) => log::debug!(target: "router.nav", "navigation {key} aborted"),
            Err(err) => log::error!(target: "router.nav", "navigation {key} failed: {err}"),
        }

        if self.store.get().owned_by_navigation(key, &cancel) {
            self.store.set(RouterState::Idle);
        } else {
            log::trace!(target: "router.nav", "navigation {key} superseded; state left alone");
        }
    }

    fn render(&mut self, response: HttpResponse) -> Result<ReconcileStats, RouterError> {
        if response.content_type.is_some() && !html::is_html(&response.content_type) {
            return Err(RouterError::NotHtml(response.content_type));
        }
        let next = parse_document(&response.text());
        let stats = patch_document(self.reconciler.as_mut(), &mut self.page, &next)?;
        self.scripts.replay(&mut self.page, self.executor.as_mut());
        Ok(stats)
    }
}
