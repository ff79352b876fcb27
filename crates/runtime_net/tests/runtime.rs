use std::time::Duration;

use bus::{Bus, CoreCommand, CoreEvent};
use core_types::ResourceKind;
use net::{HttpRequest, NetConfig};
use runtime_net::start_net_runtime;
use tokio::runtime::Runtime;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn fetch_command_yields_done_event_with_same_request_id() {
    let rt = Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>a</p>", "text/html"))
            .mount(&server),
    );

    let (bus, cmd_rx) = Bus::new();
    start_net_runtime(cmd_rx, bus.evt_tx.clone(), NetConfig::default()).expect("runtime");
    bus.cmd_tx
        .send(CoreCommand::Fetch {
            request_id: 41,
            kind: ResourceKind::Navigation,
            request: HttpRequest::get(format!("{}/a", server.uri())),
        })
        .expect("send");

    match bus.evt_rx.recv_timeout(WAIT).expect("event") {
        CoreEvent::NetworkDone {
            request_id,
            kind,
            response,
        } => {
            assert_eq!(request_id, 41);
            assert_eq!(kind, ResourceKind::Navigation);
            assert_eq!(response.text(), "<p>a</p>");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn cancel_request_aborts_slow_fetch() {
    let rt = Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("late", "text/html")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server),
    );

    let (bus, cmd_rx) = Bus::new();
    start_net_runtime(cmd_rx, bus.evt_tx.clone(), NetConfig::default()).expect("runtime");
    bus.cmd_tx
        .send(CoreCommand::Fetch {
            request_id: 9,
            kind: ResourceKind::Prefetch,
            request: HttpRequest::get(format!("{}/slow", server.uri())),
        })
        .expect("send");
    bus.cmd_tx
        .send(CoreCommand::CancelRequest { request_id: 9 })
        .expect("send");

    match bus.evt_rx.recv_timeout(WAIT).expect("event") {
        CoreEvent::NetworkError {
            request_id,
            cancelled,
            ..
        } => {
            assert_eq!(request_id, 9);
            assert!(cancelled);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn cancelling_unknown_request_is_harmless() {
    let (bus, cmd_rx) = Bus::new();
    let handle =
        start_net_runtime(cmd_rx, bus.evt_tx.clone(), NetConfig::default()).expect("runtime");
    bus.cmd_tx
        .send(CoreCommand::CancelRequest { request_id: 1234 })
        .expect("send");
    let Bus { cmd_tx, .. } = bus;
    drop(cmd_tx);
    handle.join().expect("runtime thread exits cleanly");
}
