//! Postback traversal against a mock portal

use crate::support::{config_from, delta_block, fast_client, memory_aggregator, select};
use land_ledger::crawler::{harvest, StatefulTraversal};
use land_ledger::{HarvestError, Level};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn portal_toml(base_url: &str) -> String {
    format!(
        r#"
[output]
directory = "out"

[[portal]]
name = "mh"
kind = "stateful"
base-url = "{}/Satbara.aspx"

[portal.stateful]
script-manager = "ctl00$SM"
update-panel = "ctl00$UP"
cooldown-ms = 0
settle-ms = 0

[portal.stateful.region]
field = "ctl00$ddlMainDist"

[portal.stateful.subregion]
field = "ctl00$ddlTalForAll"

[portal.stateful.subregion.flags]
"ctl00$rbtnSearchType" = "17"

[portal.stateful.locality]
field = "ctl00$ddlVillForAll"
"#,
        base_url
    )
}

fn landing_page() -> String {
    format!(
        r#"<html><body><form>
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="v1" />
<input type="hidden" name="__EVENTVALIDATION" value="e1" />
{}
</form></body></html>"#,
        select(
            "ctl00_ddlMainDist",
            &[("0", "Please Select"), ("1", "North")]
        )
    )
}

async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Satbara.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_postback_descent_threads_form_state() {
    let server = MockServer::start().await;
    mount_landing(&server).await;

    // Region step: must carry the landing page tokens
    let mandals = delta_block(
        "updatePanel",
        "ctl00_UP",
        &select("ctl00_ddlTalForAll", &[("0", "Please Select"), ("10", "Alpha")]),
    ) + &delta_block("hiddenField", "__VIEWSTATE", "v2");
    Mock::given(method("POST"))
        .and(path("/Satbara.aspx"))
        .and(body_string_contains("__EVENTTARGET=ctl00%24ddlMainDist"))
        .and(body_string_contains("__VIEWSTATE=v1"))
        .and(body_string_contains("__EVENTVALIDATION=e1"))
        .and(body_string_contains("ctl00%24rbtnSearchType=17"))
        .respond_with(ResponseTemplate::new(200).set_body_string(mandals))
        .expect(1)
        .mount(&server)
        .await;

    // Sub-region step: must carry the token issued by the region step
    let villages = delta_block(
        "updatePanel",
        "ctl00_UP",
        &select("ctl00_ddlVillForAll", &[("100", "Lakeview")]),
    ) + &delta_block("hiddenField", "__VIEWSTATE", "v3");
    Mock::given(method("POST"))
        .and(path("/Satbara.aspx"))
        .and(body_string_contains("__EVENTTARGET=ctl00%24ddlTalForAll"))
        .and(body_string_contains("__VIEWSTATE=v2"))
        .and(body_string_contains("ctl00%24ddlMainDist=1"))
        .and(body_string_contains("ctl00%24ddlTalForAll=10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(villages))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_from(&portal_toml(&server.uri()));
    let portal = &config.portals[0];
    let traversal = StatefulTraversal::new(portal, fast_client(&config, portal, 1)).unwrap();
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &[]).await.unwrap();

    assert_eq!(memory.rows_at(Level::Region), vec![vec!["1", "North"]]);
    assert_eq!(memory.rows_at(Level::SubRegion), vec![vec!["1", "10", "Alpha"]]);
    assert_eq!(memory.rows_at(Level::Locality), vec![vec!["10", "100", "Lakeview"]]);
    assert_eq!(memory.rows().len(), 3);
}

#[tokio::test]
async fn test_empty_region_list_is_session_expired() {
    let server = MockServer::start().await;

    let page = format!(
        "<html><body>{}</body></html>",
        select("ctl00_ddlMainDist", &[("0", "Please Select")])
    );
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let config = config_from(&portal_toml(&server.uri()));
    let portal = &config.portals[0];
    let traversal = StatefulTraversal::new(portal, fast_client(&config, portal, 1)).unwrap();
    let (aggregator, memory) = memory_aggregator();

    let result = harvest(&traversal, &aggregator, &[]).await;

    assert!(matches!(result, Err(HarvestError::SessionExpired { portal }) if portal == "mh"));
    assert!(memory.rows().is_empty());
}

#[tokio::test]
async fn test_failed_region_step_keeps_region_row() {
    let server = MockServer::start().await;
    mount_landing(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_from(&portal_toml(&server.uri()));
    let portal = &config.portals[0];
    let traversal = StatefulTraversal::new(portal, fast_client(&config, portal, 2)).unwrap();
    let (aggregator, memory) = memory_aggregator();

    harvest(&traversal, &aggregator, &[]).await.unwrap();

    assert_eq!(memory.rows_at(Level::Region), vec![vec!["1", "North"]]);
    assert!(memory.rows_at(Level::SubRegion).is_empty());
    let snapshot = aggregator
        .finish(land_ledger::output::RunStatus::Completed)
        .unwrap();
    assert_eq!(snapshot.unavailable(Level::SubRegion), 1);
}
