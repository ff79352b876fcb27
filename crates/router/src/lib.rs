pub mod cancel;
pub mod config;
pub mod delegate;
pub mod error;
pub mod event_loop;
pub mod form;
pub mod history;
pub mod page;
pub mod prefetch;
pub mod reconcile;
pub mod scripts;
pub mod state;

mod router;

pub use crate::cancel::CancelToken;
pub use crate::config::{ConfigError, PrefetchConfig, RouterConfig};
pub use crate::delegate::{Dispatch, Modifiers, MouseButton, UiEvent};
pub use crate::error::RouterError;
pub use crate::event_loop::{drain_ready, run_until_settled};
pub use crate::history::{History, Location, LocationKey, MemoryHistory};
pub use crate::page::PageState;
pub use crate::prefetch::{PrefetchCache, PrefetchEntry};
pub use crate::reconcile::{MorphReconciler, ReconcileError, ReconcileStats, Reconciler};
pub use crate::router::Router;
pub use crate::scripts::{LoggingExecutor, ScriptElement, ScriptExecutor, ScriptReplayer};
pub use crate::state::{
    Listeners, Navigation, RouterState, StateStore, Status, Submission, SubmissionKey,
    Subscription,
};
