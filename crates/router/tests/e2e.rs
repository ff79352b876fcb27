//! End-to-end runs through the real network runtime against a mock HTTP server.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bus::Bus;
use html::traverse::collect_element_ids;
use net::NetConfig;
use router::{PageState, Router, RouterConfig, Status, UiEvent, run_until_settled};
use runtime_net::start_net_runtime;
use tokio::runtime::Runtime;
use url::Url;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTLE: Duration = Duration::from_secs(10);

struct Site {
    rt: Runtime,
    server: MockServer,
}

impl Site {
    fn start() -> Self {
        let rt = Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        Self { rt, server }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.server.uri())).expect("url")
    }

    fn requests_to(&self, wanted: &str) -> usize {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == wanted)
            .count()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

fn start_router(site: &Site, markup: &str) -> (Router, Bus) {
    let (bus, cmd_rx) = Bus::new();
    start_net_runtime(cmd_rx, bus.evt_tx.clone(), NetConfig::default()).expect("net runtime");
    let page = PageState::parse(site.url("/"), markup);
    let mut router = Router::new(page, bus.cmd_tx.clone(), RouterConfig::default());
    router.init();
    (router, bus)
}

fn first(router: &Router, tag: &str) -> html::Id {
    let mut ids = Vec::new();
    collect_element_ids(&router.page().dom, tag, &mut ids);
    ids[0]
}

#[test]
fn post_answered_with_see_other_ends_on_target() {
    let site = Site::start();
    site.mount(
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_string("name=ada"))
            .respond_with(ResponseTemplate::new(303).insert_header("Location", "/target")),
    );
    site.mount(
        Mock::given(method("GET"))
            .and(path("/target"))
            .respond_with(html("<title>Target</title><h1>saved</h1>")),
    );

    let (mut router, bus) = start_router(
        &site,
        "<form method=post action=/submit><input name=name value=ada><button>save</button></form>",
    );
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let _sub = {
        let statuses = statuses.clone();
        router.subscribe(move |s| statuses.borrow_mut().push(s.status()))
    };

    let button = first(&router, "button");
    router.dispatch(&UiEvent::Submit {
        target: button,
        submitter: Some(button),
        default_prevented: false,
    });
    assert!(run_until_settled(&mut router, &bus.evt_rx, SETTLE));

    assert_eq!(
        *statuses.borrow(),
        vec![Status::Submitting, Status::Navigating, Status::Idle]
    );
    assert_eq!(router.page().url.path(), "/target");
    assert_eq!(router.page().title().as_deref(), Some("Target"));
    assert_eq!(router.page().body().expect("body").text_content(), "saved");
}

#[test]
fn hovered_link_is_fetched_exactly_once() {
    let site = Site::start();
    site.mount(
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(html("<title>Two</title><p>second page</p>")),
    );

    let (mut router, bus) = start_router(&site, "<a href=/page2 rel=prefetch>two</a>");
    let link = first(&router, "a");

    router.dispatch(&UiEvent::MouseEnter { target: link });
    router.dispatch(&UiEvent::click(link));
    assert!(run_until_settled(&mut router, &bus.evt_rx, SETTLE));

    assert_eq!(router.get_state().status(), Status::Idle);
    assert_eq!(router.page().title().as_deref(), Some("Two"));
    assert_eq!(site.requests_to("/page2"), 1);
}

#[test]
fn navigation_failure_settles_idle_and_keeps_page() {
    let site = Site::start();
    site.mount(
        Mock::given(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json")),
    );

    let (mut router, bus) = start_router(&site, "<p>start</p>");
    router.navigate("/data").expect("navigate");
    assert!(run_until_settled(&mut router, &bus.evt_rx, SETTLE));

    assert_eq!(router.get_state().status(), Status::Idle);
    assert_eq!(router.page().body().expect("body").text_content(), "start");
}
