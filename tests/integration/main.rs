//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for land-record portals and exercise the
//! request client, both traversal strategies, and the full harvest end-to-end.

mod crawl_tests;
mod fetcher_tests;
mod stateful_tests;
mod stateless_tests;
mod support;
