//! Retry and session behavior of the request client

use crate::support::{config_from, fast_client};
use land_ledger::crawler::{ConcurrencyLimiter, PortalRequest};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn portal_config(base_url: &str) -> land_ledger::Config {
    config_from(&format!(
        r#"
[output]
directory = "out"

[[portal]]
name = "tg"
kind = "stateless"
base-url = "{}"

[portal.cookies]
JSESSIONID = "abc123"

[portal.headers]
X-Requested-With = "XMLHttpRequest"

[portal.stateless]
[portal.stateless.subregion]
path = "mandals"
"#,
        base_url
    ))
}

fn get(server: &MockServer, route: &str) -> PortalRequest {
    let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
    PortalRequest::get(url, format!("GET {}", route))
}

#[tokio::test]
async fn test_fail_fail_succeed_within_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let client = fast_client(&config, &config.portals[0], 3);

    let report = client.send_with_report(&get(&server, "/flaky")).await;

    assert_eq!(report.body.as_deref(), Some("payload"));
    assert_eq!(report.attempts, 3);
    assert_eq!(
        report.backoffs,
        vec![Duration::from_millis(5), Duration::from_millis(10)]
    );
    assert!(report.backoffs[0] < report.backoffs[1]);
}

#[tokio::test]
async fn test_exhaustion_returns_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let client = fast_client(&config, &config.portals[0], 3);

    let report = client.send_with_report(&get(&server, "/down")).await;
    assert!(report.is_exhausted());
    assert_eq!(report.attempts, 3);
    // No wait follows the final attempt
    assert_eq!(report.backoffs.len(), 2);
}

#[tokio::test]
async fn test_send_yields_empty_string_on_exhaustion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let client = fast_client(&config, &config.portals[0], 2);

    assert_eq!(client.send(&get(&server, "/missing")).await, "");
}

#[tokio::test]
async fn test_session_cookie_and_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .and(header("cookie", "JSESSIONID=abc123"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let client = fast_client(&config, &config.portals[0], 1);

    assert_eq!(client.send(&get(&server, "/session")).await, "ok");
}

#[tokio::test]
async fn test_form_post_is_url_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(body_string_contains("__ASYNCPOST=true"))
        .and(body_string_contains("ctl00%24ddlMainDist=13"))
        .respond_with(ResponseTemplate::new(200).set_body_string("posted"))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let client = fast_client(&config, &config.portals[0], 1);
    let url = Url::parse(&format!("{}/form", server.uri())).unwrap();
    let form = vec![
        ("__ASYNCPOST".to_string(), "true".to_string()),
        ("ctl00$ddlMainDist".to_string(), "13".to_string()),
    ];

    let body = client.send(&PortalRequest::post_form(url, form, "postback")).await;
    assert_eq!(body, "posted");
}

#[tokio::test]
async fn test_limiter_permits_released_after_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri());
    let limiter = Arc::new(ConcurrencyLimiter::new(1));
    let client = fast_client(&config, &config.portals[0], 2).with_limiter(Arc::clone(&limiter));

    assert!(client.send_with_report(&get(&server, "/a")).await.is_exhausted());
    assert!(client.send_with_report(&get(&server, "/b")).await.is_exhausted());

    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(limiter.peak(), 1);
}
