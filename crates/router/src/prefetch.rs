//! Speculative fetches issued on hover/focus and adopted by the next navigation.
//!
//! Entries are keyed by absolute URL without its fragment. They are create-only: a second
//! trigger for the same key is a no-op, nothing expires by time, and the whole cache is
//! dropped on every committed history change.

use std::collections::HashMap;

use core_types::RequestId;
use net::HttpResponse;
use url::Url;

use crate::cancel::CancelToken;
use crate::error::RouterError;

pub type FetchOutcome = Result<HttpResponse, RouterError>;

#[derive(Debug)]
pub struct PrefetchEntry {
    pub url: Url,
    pub request_id: RequestId,
    pub cancel: CancelToken,
    /// `None` while the request is in flight.
    pub response: Option<FetchOutcome>,
}

impl PrefetchEntry {
    pub fn is_pending(&self) -> bool {
        self.response.is_none()
    }
}

/// Cache key: the URL as sent on the wire.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[derive(Debug, Default)]
pub struct PrefetchCache {
    entries: HashMap<String, PrefetchEntry>,
}

impl PrefetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a prefetch of `url` through `issue` unless one exists for it, it is the page
    /// being shown, or it leaves `current`'s origin. Returns whether a request went out.
    pub fn trigger(
        &mut self,
        url: &Url,
        current: &Url,
        issue: impl FnOnce(&Url) -> CancelToken,
    ) -> bool {
        let key = cache_key(url);
        if self.entries.contains_key(&key) {
            log::trace!(target: "router.prefetch", "already cached: {key}");
            return false;
        }
        if key == cache_key(current) {
            log::trace!(target: "router.prefetch", "skip current page: {key}");
            return false;
        }
        if url.origin() != current.origin() {
            log::trace!(target: "router.prefetch", "skip cross-origin: {key}");
            return false;
        }

        let mut request_url = url.clone();
        request_url.set_fragment(None);
        let cancel = issue(&request_url);
        log::debug!(target: "router.prefetch", "prefetch #{} {key}", cancel.request_id());
        self.entries.insert(
            key,
            PrefetchEntry {
                url: request_url,
                request_id: cancel.request_id(),
                cancel,
                response: None,
            },
        );
        true
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries.contains_key(&cache_key(url))
    }

    pub fn get(&self, url: &Url) -> Option<&PrefetchEntry> {
        self.entries.get(&cache_key(url))
    }

    /// Removes and returns the entry for `url` so a navigation can adopt it.
    pub fn take(&mut self, url: &Url) -> Option<PrefetchEntry> {
        self.entries.remove(&cache_key(url))
    }

    /// Stores a transport result in the entry that owns `request_id`. False when no entry
    /// does (the cache was cleared or the entry adopted).
    pub fn complete(&mut self, request_id: RequestId, outcome: FetchOutcome) -> bool {
        match self
            .entries
            .values_mut()
            .find(|entry| entry.request_id == request_id && entry.is_pending())
        {
            Some(entry) => {
                log::trace!(target: "router.prefetch", "ready #{request_id} {}", entry.url);
                entry.response = Some(outcome);
                true
            }
            None => false,
        }
    }

    /// Drops every entry, cancelling requests nobody adopted.
    pub fn clear(&mut self) {
        for (key, entry) in self.entries.drain() {
            if entry.is_pending() {
                log::trace!(target: "router.prefetch", "drop in-flight {key}");
                entry.cancel.cancel();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::CoreCommand;
    use std::sync::mpsc;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    struct Issuer {
        tx: mpsc::Sender<CoreCommand>,
        rx: mpsc::Receiver<CoreCommand>,
        next: RequestId,
        issued: Vec<String>,
    }

    impl Issuer {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                tx,
                rx,
                next: 1,
                issued: Vec::new(),
            }
        }

        fn trigger(&mut self, cache: &mut PrefetchCache, target: &str, current: &str) -> bool {
            let id = self.next;
            let tx = self.tx.clone();
            let issued = &mut self.issued;
            let started = cache.trigger(&url(target), &url(current), |u| {
                issued.push(u.to_string());
                CancelToken::new(id, tx)
            });
            if started {
                self.next += 1;
            }
            started
        }
    }

    #[test]
    fn second_trigger_for_same_url_is_noop() {
        let mut cache = PrefetchCache::new();
        let mut issuer = Issuer::new();
        assert!(issuer.trigger(&mut cache, "https://s.test/p2", "https://s.test/"));
        assert!(!issuer.trigger(&mut cache, "https://s.test/p2#frag", "https://s.test/"));
        assert_eq!(issuer.issued, vec!["https://s.test/p2".to_string()]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn current_page_and_foreign_origins_are_skipped() {
        let mut cache = PrefetchCache::new();
        let mut issuer = Issuer::new();
        assert!(!issuer.trigger(&mut cache, "https://s.test/here#top", "https://s.test/here"));
        assert!(!issuer.trigger(&mut cache, "https://other.test/x", "https://s.test/here"));
        assert!(issuer.issued.is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn completion_lands_in_owning_entry_only() {
        let mut cache = PrefetchCache::new();
        let mut issuer = Issuer::new();
        issuer.trigger(&mut cache, "https://s.test/p2", "https://s.test/");

        assert!(!cache.complete(99, Err(RouterError::Aborted)));
        assert!(cache.complete(1, Err(RouterError::Network("down".into()))));
        let entry = cache.get(&url("https://s.test/p2")).expect("entry");
        assert!(!entry.is_pending());
        // A second result for the same request is ignored.
        assert!(!cache.complete(1, Err(RouterError::Aborted)));
    }

    #[test]
    fn clear_cancels_only_pending_entries() {
        let mut cache = PrefetchCache::new();
        let mut issuer = Issuer::new();
        issuer.trigger(&mut cache, "https://s.test/a", "https://s.test/");
        issuer.trigger(&mut cache, "https://s.test/b", "https://s.test/");
        cache.complete(2, Err(RouterError::Network("down".into())));

        cache.clear();
        assert!(cache.is_empty());

        let cancelled: Vec<RequestId> = issuer
            .rx
            .try_iter()
            .filter_map(|cmd| match cmd {
                CoreCommand::CancelRequest { request_id } => Some(request_id),
                _ => None,
            })
            .collect();
        assert_eq!(cancelled, vec![1]);
    }

    #[test]
    fn taken_entry_is_no_longer_cancelled_by_clear() {
        let mut cache = PrefetchCache::new();
        let mut issuer = Issuer::new();
        issuer.trigger(&mut cache, "https://s.test/a", "https://s.test/");

        let entry = cache.take(&url("https://s.test/a")).expect("entry");
        cache.clear();
        assert!(!entry.cancel.is_cancelled());
        assert!(issuer.rx.try_recv().is_err());
    }
}
