//! Router state machine and its subscriber registry.
//!
//! Invariants:
//! - Exactly one `RouterState` value is current; navigating and submitting are variants
//!   of one enum, so they can never hold together.
//! - Every `set` notifies each live subscriber once, in subscription order, with the new
//!   state already in place.
//! - A subscription added while a notification is running first sees the next change; one
//!   removed mid-notification is not called again.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use core_types::Method;
use url::Url;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::history::{Location, LocationKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubmissionKey(pub Uuid);

impl SubmissionKey {
    pub fn new() -> Self {
        SubmissionKey(Uuid::new_v4())
    }
}

impl Default for SubmissionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub key: SubmissionKey,
    pub action: Url,
    pub method: Method,
    pub form_data: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Navigating,
    Submitting,
}

#[derive(Clone, Debug, Default)]
pub enum RouterState {
    #[default]
    Idle,
    Navigating {
        navigation: Navigation,
        cancel: CancelToken,
    },
    Submitting {
        submission: Submission,
        cancel: CancelToken,
    },
}

impl RouterState {
    pub fn status(&self) -> Status {
        match self {
            RouterState::Idle => Status::Idle,
            RouterState::Navigating { .. } => Status::Navigating,
            RouterState::Submitting { .. } => Status::Submitting,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RouterState::Idle)
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        match self {
            RouterState::Idle => None,
            RouterState::Navigating { cancel, .. } | RouterState::Submitting { cancel, .. } => {
                Some(cancel)
            }
        }
    }

    pub fn navigation_key(&self) -> Option<LocationKey> {
        match self {
            RouterState::Navigating { navigation, .. } => Some(navigation.location.key),
            _ => None,
        }
    }

    pub fn submission_key(&self) -> Option<SubmissionKey> {
        match self {
            RouterState::Submitting { submission, .. } => Some(submission.key),
            _ => None,
        }
    }

    /// Whether this state still belongs to the navigation started with `key` and `cancel`.
    pub(crate) fn owned_by_navigation(&self, key: LocationKey, cancel: &CancelToken) -> bool {
        match self {
            RouterState::Navigating {
                navigation,
                cancel: current,
            } => navigation.location.key == key && current.same_as(cancel),
            _ => false,
        }
    }

    pub(crate) fn owned_by_submission(&self, key: SubmissionKey) -> bool {
        self.submission_key() == Some(key)
    }
}

type Callback = Rc<RefCell<dyn FnMut(&RouterState)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry, _)| *entry != id);
    }
}

/// Cloneable handle onto a store's subscriber list, usable from inside callbacks.
#[derive(Clone, Default)]
pub struct Listeners {
    registry: Rc<RefCell<Registry>>,
}

impl Listeners {
    pub fn subscribe(&self, callback: impl FnMut(&RouterState) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        let callback: Callback = Rc::new(RefCell::new(callback));
        registry.entries.push((id, callback));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, state: &RouterState) {
        let snapshot: Vec<(u64, Callback)> = self.registry.borrow().entries.clone();
        for (id, callback) in snapshot {
            if !self.registry.borrow().contains(id) {
                continue;
            }
            // A callback cannot re-enter itself; skip rather than panic.
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (callback)(state);
            }
        }
    }
}

/// Keeps a callback registered until dropped or explicitly unsubscribed.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[derive(Default)]
pub struct StateStore {
    state: RouterState,
    listeners: Listeners,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &RouterState {
        &self.state
    }

    pub fn subscribe(&self, callback: impl FnMut(&RouterState) + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn listeners(&self) -> Listeners {
        self.listeners.clone()
    }

    pub(crate) fn set(&mut self, next: RouterState) {
        log::debug!(
            target: "router.state",
            "{:?} -> {:?}",
            self.state.status(),
            next.status()
        );
        self.state = next;
        self.listeners.notify(&self.state);
    }
}
