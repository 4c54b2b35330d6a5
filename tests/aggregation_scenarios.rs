//! End-to-end aggregation scenarios through the public API.

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;
use weather_aggregator::{
    AggregationConfig, FixedSource, HttpSource, Location, SimulationProfile, SourceName,
    WeatherAggregationEngine, WeatherReport, WeatherSource, reference_sources,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn covered(report: &WeatherReport) -> BTreeSet<String> {
    report.sources().map(|s| s.as_str().to_string()).collect()
}

fn assert_consistent(report: &WeatherReport, expected: &[&str]) {
    let expected: BTreeSet<String> = expected.iter().map(|s| (*s).to_string()).collect();
    assert_eq!(covered(report), expected);
    assert_eq!(
        report.success_count() + report.failure_count(),
        expected.len()
    );

    if report.has_no_readings() {
        assert_eq!(report.average_temperature(), 0.0);
        assert_eq!(report.fastest_source(), "Unknown");
    } else {
        assert!(report.reading(report.fastest_source()).is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn staggered_sources_all_succeed() {
    let engine = WeatherAggregationEngine::with_defaults(vec![
        Arc::new(FixedSource::reading("API1", 20, ms(300))),
        Arc::new(FixedSource::reading("API2", 22, ms(600))),
        Arc::new(FixedSource::reading("API3", 24, ms(900))),
    ])
    .unwrap();

    let report = assert_ok!(engine.get_aggregated_weather(&Location::from("Paris")).await);

    assert_consistent(&report, &["API1", "API2", "API3"]);
    assert_eq!(report.fastest_source(), "API1");
    assert_eq!(report.average_temperature(), 22.0);
    assert_eq!(report.source_temperatures().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn second_source_always_fails() {
    let engine = WeatherAggregationEngine::with_defaults(vec![
        Arc::new(FixedSource::reading("API1", 20, ms(300))),
        Arc::new(FixedSource::failing("API2", ms(600))),
        Arc::new(FixedSource::reading("API3", 30, ms(900))),
    ])
    .unwrap();

    let report = engine
        .get_aggregated_weather(&Location::from("Paris"))
        .await
        .unwrap();

    assert_consistent(&report, &["API1", "API2", "API3"]);
    assert_eq!(report.source_temperatures().len(), 2);
    assert_eq!(report.failed_sources(), &[SourceName::new("API2")]);
    assert_eq!(report.average_temperature(), 25.0);
}

#[tokio::test(start_paused = true)]
async fn timeout_reports_stragglers_as_failed() {
    let engine = WeatherAggregationEngine::new(
        vec![
            Arc::new(FixedSource::reading("API1", 10, ms(4000))),
            Arc::new(FixedSource::reading("API2", 16, ms(200))),
            Arc::new(FixedSource::reading("API3", 99, ms(7000))),
        ],
        AggregationConfig::default(),
    )
    .unwrap();

    let started = tokio::time::Instant::now();
    let report = engine
        .get_aggregated_weather(&Location::from("Paris"))
        .await
        .unwrap();

    assert!(started.elapsed() >= ms(5000));
    assert!(started.elapsed() < ms(5100));
    assert_consistent(&report, &["API1", "API2", "API3"]);
    assert_eq!(report.failed_sources(), &[SourceName::new("API3")]);
    assert_eq!(report.average_temperature(), 13.0);
    assert_eq!(report.fastest_source(), "API2");
}

#[tokio::test(start_paused = true)]
async fn everything_times_out() {
    let engine = WeatherAggregationEngine::new(
        vec![
            Arc::new(FixedSource::reading("API1", 10, ms(900))),
            Arc::new(FixedSource::reading("API2", 16, ms(900))),
        ],
        AggregationConfig::with_timeout(100),
    )
    .unwrap();

    let report = engine
        .get_aggregated_weather(&Location::from("Paris"))
        .await
        .unwrap();

    assert_consistent(&report, &["API1", "API2"]);
    assert_eq!(report.average_temperature(), 0.0);
    assert_eq!(report.fastest_source(), "Unknown");
}

#[tokio::test(start_paused = true)]
async fn seeded_reference_sources_keep_invariants() {
    for seed in 0..25u64 {
        let engine = WeatherAggregationEngine::with_defaults(reference_sources(
            SimulationProfile::default(),
            Some(seed),
        ))
        .unwrap();

        let report = engine
            .get_aggregated_weather(&Location::from("London"))
            .await
            .unwrap();

        assert_consistent(&report, &["API1", "API2", "API3"]);
        for (name, reading) in report.source_temperatures() {
            let expected = match name.as_str() {
                "API1" => 24,
                "API2" => 35,
                "API3" => 54,
                other => panic!("unexpected source {other}"),
            };
            assert_eq!(reading.get(), expected);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn reliable_reference_sources_average() {
    let engine = WeatherAggregationEngine::with_defaults(reference_sources(
        SimulationProfile::reliable(ms(1500)),
        Some(3),
    ))
    .unwrap();

    let report = engine
        .get_aggregated_weather(&Location::from("London"))
        .await
        .unwrap();

    assert!(report.failed_sources().is_empty());
    assert!((report.average_temperature() - 113.0 / 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn http_sources_aggregate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/north"))
        .and(query_param("location", "Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "temperature": -4 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/south"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "temperature": 2 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sources: Vec<Arc<dyn WeatherSource>> = ["north", "south", "broken"]
        .iter()
        .map(|name| -> Arc<dyn WeatherSource> {
            Arc::new(HttpSource::new(*name, format!("{}/{name}", server.uri()), 1000).unwrap())
        })
        .collect();

    let engine = WeatherAggregationEngine::with_defaults(sources).unwrap();
    let report = engine
        .get_aggregated_weather(&Location::from("Oslo"))
        .await
        .unwrap();

    assert_consistent(&report, &["north", "south", "broken"]);
    assert_eq!(report.failed_sources(), &[SourceName::new("broken")]);
    assert_eq!(report.average_temperature(), -1.0);
}

#[tokio::test(start_paused = true)]
async fn report_serializes_to_json() {
    let engine = WeatherAggregationEngine::with_defaults(vec![
        Arc::new(FixedSource::reading("API1", 20, ms(100))),
        Arc::new(FixedSource::failing("API2", ms(50))),
    ])
    .unwrap();

    let report = engine
        .get_aggregated_weather(&Location::from("Paris"))
        .await
        .unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(
        value,
        json!({
            "average_temperature": 20.0,
            "source_temperatures": { "API1": 20 },
            "failed_sources": ["API2"],
            "fastest_source": "API1",
        })
    );
}
