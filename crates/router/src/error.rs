use html::Id;
use thiserror::Error;

use crate::reconcile::ReconcileError;

/// Failures inside the navigation and submission pipelines. None of these reach
/// `Router::dispatch` callers; the pipelines log them and settle the state machine.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request aborted")]
    Aborted,
    #[error("response is not html (content type {0:?})")]
    NotHtml(Option<String>),
    #[error("malformed url {url:?}: {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("refusing cross-origin navigation to {0}")]
    CrossOrigin(String),
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("document has no <{0}>")]
    MissingSection(&'static str),
    #[error("node {0:?} is not a <form> in the live document")]
    NotAForm(Id),
    #[error("router is not active")]
    Inactive,
}

impl RouterError {
    pub(crate) fn malformed(url: &str, source: url::ParseError) -> Self {
        RouterError::MalformedUrl {
            url: url.to_string(),
            source,
        }
    }
}
