//! Simple web checks against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_poller::checks::simple::SimpleChecker;
use vigil_poller::checks::{CheckDispatcher, CheckOutcome};
use vigil_poller::CheckType;

use crate::helpers::simple_item;

fn dispatcher() -> CheckDispatcher {
    CheckDispatcher::new(Duration::from_secs(3)).with_checker(
        CheckType::Simple,
        Arc::new(SimpleChecker::new(Duration::from_secs(2))),
    )
}

#[tokio::test]
async fn page_get_returns_trimmed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("all good\r\n"))
        .mount(&mock_server)
        .await;

    let key = format!("web.page.get[{}/health]", mock_server.uri());
    let outcome = dispatcher().dispatch(&simple_item(1, 7, &key)).await;

    assert_eq!(outcome, CheckOutcome::Success("all good".into()));
}

#[tokio::test]
async fn page_regexp_extracts_the_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("queue depth: 472 items"))
        .mount(&mock_server)
        .await;

    let key = format!("web.page.regexp[{}/status,[0-9]+]", mock_server.uri());
    let outcome = dispatcher().dispatch(&simple_item(1, 7, &key)).await;

    assert_eq!(outcome, CheckOutcome::Success("472".into()));
}

#[tokio::test]
async fn page_regexp_without_match_yields_empty_value() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("no digits here"))
        .mount(&mock_server)
        .await;

    let key = format!("web.page.regexp[{}/status,[0-9]+]", mock_server.uri());
    let outcome = dispatcher().dispatch(&simple_item(1, 7, &key)).await;

    assert_eq!(outcome, CheckOutcome::Success("".into()));
}

#[tokio::test]
async fn tcp_port_against_live_server() {
    let mock_server = MockServer::start().await;
    let uri = url::Url::parse(&mock_server.uri()).unwrap();

    let key = format!(
        "net.tcp.port[{},{}]",
        uri.host_str().unwrap(),
        uri.port().unwrap()
    );
    let outcome = dispatcher().dispatch(&simple_item(1, 7, &key)).await;

    assert_eq!(outcome, CheckOutcome::Success("1".into()));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // nothing listens on port 1
    let outcome = dispatcher()
        .dispatch(&simple_item(1, 7, "web.page.get[http://127.0.0.1:1/]"))
        .await;

    assert_matches!(outcome, CheckOutcome::NetworkError(_));
}
