//! GET-endpoint traversal against a mock portal

use crate::support::{config_from, fast_client, memory_aggregator, select};
use land_ledger::crawler::{harvest, ConcurrencyLimiter, StatelessTraversal};
use land_ledger::output::RunStatus;
use land_ledger::{Config, HarvestError, Level};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINTS: &str = r#"
[portal.stateless]
root-path = "knowLandStatus"
region-hint = "district"

[portal.stateless.subregion]
path = "mandals"
numeric-ids = true

[portal.stateless.subregion.params]
district = "{region}"

[portal.stateless.locality]
path = "villages"
format = "json"
id-fields = ["villId", "villageId", "id"]
label-fields = ["villName", "name"]

[portal.stateless.locality.params]
mandal = "{subregion}"
"#;

const PARCEL_ENDPOINTS: &str = r#"
[portal.stateless.parcel]
path = "surveys"

[portal.stateless.parcel.params]
village = "{locality}"

[portal.stateless.record]
path = "khatas"
format = "json"
id-fields = ["khataNo"]
label-fields = ["pattadar"]

[portal.stateless.record.params]
village = "{locality}"
survey = "{parcel}"
"#;

fn portal_config(base_url: &str, endpoints: &str) -> Config {
    config_from(&format!(
        r#"
[output]
directory = "out"

[[portal]]
name = "tg"
kind = "stateless"
base-url = "{}"
{}{}"#,
        base_url, ENDPOINTS, endpoints
    ))
}

fn traversal(config: &Config, ceiling: usize, budget: u32) -> StatelessTraversal {
    let portal = &config.portals[0];
    StatelessTraversal::new(
        portal,
        fast_client(config, portal, budget),
        Arc::new(ConcurrencyLimiter::new(ceiling)),
    )
    .unwrap()
}

async fn mount_get(server: &MockServer, route: &str, params: &[(&str, &str)], body: String) {
    let mut mock = Mock::given(method("GET")).and(path(route));
    for (name, value) in params {
        mock = mock.and(query_param(*name, *value));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_regions(server: &MockServer, regions: &[(&str, &str)]) {
    let mut options = vec![("0", "Please Select")];
    options.extend_from_slice(regions);
    let page = format!(
        "<html><body>{}</body></html>",
        select("districtID", &options)
    );
    mount_get(server, "/knowLandStatus", &[], page).await;
}

#[tokio::test]
async fn test_three_level_descent() {
    let server = MockServer::start().await;
    mount_regions(&server, &[("1", "North")]).await;
    mount_get(
        &server,
        "/mandals",
        &[("district", "1")],
        r#"<option value="0">Please Select</option><option value="010">Alpha</option>"#.to_string(),
    )
    .await;
    mount_get(
        &server,
        "/villages",
        &[("mandal", "10")],
        r#"{"data": [{"villId": 100, "villName": "Lakeview"}]}"#.to_string(),
    )
    .await;

    let config = portal_config(&server.uri(), "");
    let traversal = traversal(&config, 10, 1);
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &[]).await.unwrap();

    assert_eq!(memory.rows_at(Level::Region), vec![vec!["1", "North"]]);
    assert_eq!(memory.rows_at(Level::SubRegion), vec![vec!["1", "10", "Alpha"]]);
    assert_eq!(memory.rows_at(Level::Locality), vec![vec!["10", "100", "Lakeview"]]);
    assert_eq!(memory.rows().len(), 3);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_ceiling() {
    let server = MockServer::start().await;
    let regions: Vec<(String, String)> = (1..=8).map(|i| (i.to_string(), format!("D{}", i))).collect();
    let region_refs: Vec<(&str, &str)> = regions.iter().map(|(c, l)| (c.as_str(), l.as_str())).collect();
    mount_regions(&server, &region_refs).await;

    Mock::given(method("GET"))
        .and(path("/mandals"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<option value="1">A</option><option value="2">B</option>"#)
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"id": 7, "name": "V"}]"#)
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let config = portal_config(&server.uri(), "");
    let traversal = traversal(&config, 3, 1);
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &[]).await.unwrap();

    let limiter = traversal.limiter();
    assert!(limiter.peak() <= 3, "peak {} exceeded ceiling", limiter.peak());
    assert!(limiter.peak() >= 2, "siblings were not explored concurrently");
    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(memory.rows_at(Level::SubRegion).len(), 16);
    assert_eq!(memory.rows_at(Level::Locality).len(), 16);
}

#[tokio::test]
async fn test_parcel_without_records_does_not_stop_siblings() {
    let server = MockServer::start().await;
    mount_regions(&server, &[("1", "North")]).await;
    mount_get(&server, "/mandals", &[], r#"<option value="10">Alpha</option>"#.to_string()).await;
    mount_get(&server, "/villages", &[], r#"[{"id": 100, "name": "Lakeview"}]"#.to_string()).await;
    mount_get(
        &server,
        "/surveys",
        &[("village", "100")],
        r#"<option value="1/A">1/A</option><option value="2">2</option><option value="3">3</option>"#
            .to_string(),
    )
    .await;

    // 1/A has no records, 2 never answers, 3 has one record
    mount_get(&server, "/khatas", &[("survey", "1/A")], "[]".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/khatas"))
        .and(query_param("survey", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/khatas",
        &[("survey", "3")],
        r#"[{"khataNo": "55", "pattadar": "Ravi"}]"#.to_string(),
    )
    .await;

    let config = portal_config(&server.uri(), PARCEL_ENDPOINTS);
    let traversal = traversal(&config, 4, 2);
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &[]).await.unwrap();

    assert_eq!(memory.rows_at(Level::Parcel).len(), 3);
    assert_eq!(memory.rows_at(Level::Record), vec![vec!["100", "3", "55", "Ravi"]]);

    let snapshot = aggregator.finish(RunStatus::Completed).unwrap();
    assert_eq!(snapshot.empty(Level::Record), 1);
    assert_eq!(snapshot.unavailable(Level::Record), 1);
}

#[tokio::test]
async fn test_region_filter() {
    let server = MockServer::start().await;
    mount_regions(&server, &[("1", "North"), ("2", "South")]).await;
    mount_get(&server, "/mandals", &[("district", "2")], r#"<option value="20">Beta</option>"#.to_string())
        .await;
    mount_get(&server, "/villages", &[], "[]".to_string()).await;

    let config = portal_config(&server.uri(), "");
    let traversal = traversal(&config, 4, 1);
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &["2".to_string()]).await.unwrap();

    assert_eq!(memory.rows_at(Level::Region), vec![vec!["2", "South"]]);
    assert_eq!(memory.rows_at(Level::SubRegion), vec![vec!["2", "20", "Beta"]]);
}

#[tokio::test]
async fn test_unknown_region_filter_is_fatal() {
    let server = MockServer::start().await;
    mount_regions(&server, &[("1", "North")]).await;

    let config = portal_config(&server.uri(), "");
    let traversal = traversal(&config, 4, 1);
    let (aggregator, _memory) = memory_aggregator();

    let result = harvest(&traversal, &aggregator, &["99".to_string()]).await;
    assert!(matches!(result, Err(HarvestError::UnknownRegions { .. })));
}

#[tokio::test]
async fn test_unreachable_portal_is_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = portal_config(&server.uri(), "");
    let traversal = traversal(&config, 4, 2);
    let (aggregator, _memory) = memory_aggregator();

    let result = harvest(&traversal, &aggregator, &[]).await;
    assert!(matches!(result, Err(HarvestError::SessionExpired { .. })));
}
