use core_types::{RequestId, ResourceKind};
use net::{HttpRequest, HttpResponse};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
pub enum CoreCommand {
    // Router -> network
    Fetch {
        request_id: RequestId,
        kind: ResourceKind,
        request: HttpRequest,
    },
    CancelRequest {
        request_id: RequestId,
    },
}

#[derive(Debug)]
pub enum CoreEvent {
    // Network -> router
    NetworkDone {
        request_id: RequestId,
        kind: ResourceKind,
        response: HttpResponse,
    },
    NetworkError {
        request_id: RequestId,
        kind: ResourceKind,
        url: String,
        error: String,
        cancelled: bool,
    },
}

impl CoreEvent {
    pub fn request_id(&self) -> RequestId {
        match self {
            CoreEvent::NetworkDone { request_id, .. }
            | CoreEvent::NetworkError { request_id, .. } => *request_id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            CoreEvent::NetworkDone { kind, .. } | CoreEvent::NetworkError { kind, .. } => *kind,
        }
    }
}

/// Router-side ends of the command and event channels. The runtime halves are handed out
/// once by [`Bus::new`].
pub struct Bus {
    pub cmd_tx: Sender<CoreCommand>,
    pub evt_rx: Receiver<CoreEvent>,
    pub evt_tx: Sender<CoreEvent>, // shareable for runtimes
}

impl Bus {
    pub fn new() -> (Bus, Receiver<CoreCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        (
            Bus {
                cmd_tx,
                evt_rx,
                evt_tx,
            },
            cmd_rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_expose_request_id_and_kind() {
        let evt = CoreEvent::NetworkError {
            request_id: 7,
            kind: ResourceKind::Prefetch,
            url: "http://a.test/".into(),
            error: "boom".into(),
            cancelled: false,
        };
        assert_eq!(evt.request_id(), 7);
        assert_eq!(evt.kind(), ResourceKind::Prefetch);
    }

    #[test]
    fn bus_halves_are_connected() {
        let (bus, cmd_rx) = Bus::new();
        bus.cmd_tx
            .send(CoreCommand::CancelRequest { request_id: 3 })
            .expect("send");
        assert!(matches!(
            cmd_rx.recv().expect("recv"),
            CoreCommand::CancelRequest { request_id: 3 }
        ));
    }
}
