use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use bus::CoreCommand;
use core_types::RequestId;

/// Cooperative cancellation for one outgoing request.
///
/// Clones share the flag. Cancelling is idempotent and forwards a single
/// `CoreCommand::CancelRequest` so the transport can stop reading; it never waits for
/// the transport to acknowledge.
#[derive(Clone)]
pub struct CancelToken {
    request_id: RequestId,
    cancelled: Rc<Cell<bool>>,
    cmd_tx: Sender<CoreCommand>,
}

impl CancelToken {
    pub fn new(request_id: RequestId, cmd_tx: Sender<CoreCommand>) -> Self {
        Self {
            request_id,
            cancelled: Rc::new(Cell::new(false)),
            cmd_tx,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }
        log::trace!(target: "router.cancel", "cancel #{}", self.request_id);
        // Transport already gone means nothing is left to stop.
        let _ = self.cmd_tx.send(CoreCommand::CancelRequest {
            request_id: self.request_id,
        });
    }

    /// True when both handles share the same flag.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Rc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
