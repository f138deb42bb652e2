//! End-to-end harvests writing CSV files

use crate::support::{config_from, select};
use land_ledger::crawler::{crawl, Coordinator, HarvestOptions};
use land_ledger::output::RunStatus;
use land_ledger::{HarvestError, Level};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_toml(base_url: &str) -> String {
    format!(
        r#"
[crawler]
retry-budget = 1
backoff-unit-ms = 1

[output]
directory = "unused"

[[portal]]
name = "bhubharati"
kind = "stateless"
base-url = "{}"

[portal.stateless]
root-path = "regions"

[portal.stateless.subregion]
path = "mandals"

[portal.stateless.subregion.params]
district = "{{region}}"

[portal.stateless.locality]
path = "villages"
format = "json"

[portal.stateless.locality.params]
mandal = "{{subregion}}"
"#,
        base_url
    )
}

async fn mount_portal(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<html><body>{}</body></html>",
            select("ddlDistrict", &[("0", "Please Select"), ("1", "North")])
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mandals"))
        .and(query_param("district", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<option value="10">Alpha, East</option>"#),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villages"))
        .and(query_param("mandal", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"[{"id": "100", "name": "Lakeview"}]"#),
        )
        .mount(server)
        .await;
}

fn read_lines(directory: &Path, level: Level) -> Vec<String> {
    let file = directory.join(level.file_name());
    std::fs::read_to_string(&file)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", file.display(), e))
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_harvest_writes_csv_per_level() {
    let server = MockServer::start().await;
    mount_portal(&server).await;

    let output = TempDir::new().unwrap();
    let config = config_from(&config_toml(&server.uri()));
    let options = HarvestOptions {
        output: Some(output.path().to_path_buf()),
        ..Default::default()
    };

    let results = crawl(config, options).await.unwrap();

    assert_eq!(results.len(), 1);
    let (name, snapshot) = &results[0];
    assert_eq!(name, "bhubharati");
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(snapshot.total_rows(), 3);

    let directory = output.path().join("bhubharati");
    assert_eq!(read_lines(&directory, Level::Region), vec!["id,name", "1,North"]);
    assert_eq!(
        read_lines(&directory, Level::SubRegion),
        vec!["region_id,id,name", "1,10,\"Alpha, East\""]
    );
    assert_eq!(
        read_lines(&directory, Level::Locality),
        vec!["subregion_id,id,name", "10,100,Lakeview"]
    );
    // Levels below the deepest endpoint still get a header-only file
    assert_eq!(read_lines(&directory, Level::Parcel), vec!["locality_id,code,label"]);
}

#[tokio::test]
async fn test_expired_session_aborts_harvest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Session expired</body></html>"))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = config_from(&config_toml(&server.uri()));
    let coordinator = Coordinator::new(
        config,
        HarvestOptions {
            output: Some(output.path().to_path_buf()),
            ..Default::default()
        },
    )
    .unwrap();

    let result = coordinator.run().await;
    assert!(matches!(result, Err(HarvestError::SessionExpired { .. })));

    // The region file exists with only its header
    let directory = output.path().join("bhubharati");
    assert_eq!(read_lines(&directory, Level::Region), vec!["id,name"]);
}

#[tokio::test]
async fn test_region_override_from_options() {
    let server = MockServer::start().await;
    mount_portal(&server).await;

    let output = TempDir::new().unwrap();
    let config = config_from(&config_toml(&server.uri()));
    let options = HarvestOptions {
        portals: vec!["bhubharati".to_string()],
        regions: vec!["7".to_string()],
        output: Some(output.path().to_path_buf()),
    };

    let result = crawl(config, options).await;
    assert!(matches!(
        result,
        Err(HarvestError::UnknownRegions { requested, .. }) if requested == "7"
    ));
}
