use core_types::ResourceKind;
use html::Id;
use url::Url;

use super::{Pending, Router};
use crate::cancel::CancelToken;
use crate::error::RouterError;
use crate::form::serialize_form;
use crate::prefetch::FetchOutcome;
use crate::state::{RouterState, Submission, SubmissionKey};

impl Router {
    /// Submits `form` (optionally via the `submitter` button) in place of the native submit.
    ///
    /// Errors are returned only when nothing was sent: the router is inactive, `form` is not
    /// a form, or its action does not resolve. Once the request is out, failures are logged and settle the state
    /// machine instead.
    pub fn submit_form(
        &mut self,
        form: Id,
        submitter: Option<Id>,
    ) -> Result<SubmissionKey, RouterError> {
        if !self.is_active() {
            return Err(RouterError::Inactive);
        }
        let key = SubmissionKey::new();
        let request = serialize_form(&self.page, form, submitter)?;
        let wire = request.to_http();

        self.cancel_active();
        let cancel = self.mint_token();
        self.in_flight.insert(
            cancel.request_id(),
            Pending::Submission {
                key,
                cancel: cancel.clone(),
            },
        );
        log::debug!(target: "router.submit", "submit {key}: {} {}", request.method, request.action);

        self.store.set(RouterState::Submitting {
            submission: Submission {
                key,
                action: request.action,
                method: request.method,
                form_data: request.form_data,
            },
            cancel: cancel.clone(),
        });
        self.send_fetch(cancel.request_id(), ResourceKind::Submission, wire);
        Ok(key)
    }

    pub(crate) fn finish_submission(
        &mut self,
        key: SubmissionKey,
        cancel: CancelToken,
        outcome: FetchOutcome,
    ) {
        let outcome = if cancel.is_cancelled() {
            Err(RouterError::Aborted)
        } else {
            outcome
        };

        match outcome {
            Ok(response) if response.redirected => match Url::parse(&response.url) {
                Ok(url) => {
                    log::debug!(target: "router.submit", "submission {key} redirected to {url}");
                    // The navigation supersedes `Submitting`; no idle transition here.
                    self.push_location(url);
                    return;
                }
                Err(err) => log::error!(
                    target: "router.submit",
                    "submission {key} redirected to unusable url {:?}: {err}",
                    response.url
                ),
            },
            Ok(response) => log::debug!(
                target: "router.submit",
                "submission {key} answered {} without redirect",
                response.status
            ),
            Err(RouterError::Aborted) => {
                log::debug!(target: "router.submit", "submission {key} aborted")
            }
            Err(err) => log::error!(target: "router.submit", "submission {key} failed: {err}"),
        }

        if self.store.get().owned_by_submission(key) {
            self.store.set(RouterState::Idle);
        }
    }
}
