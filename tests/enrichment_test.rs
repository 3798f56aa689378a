use async_trait::async_trait;
use autos_prep::app::ports::{AttributeResolver, Resolution};
use autos_prep::config::ScraperConfig;
use autos_prep::error::{LookupError, PipelineError};
use autos_prep::pipeline::{run_scrape, Enricher};
use autos_prep::storage::load_csv;
use autos_prep::table::{Table, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tracing::Span;

/// Answers from a fixed map; models in `unreachable` fail to fetch,
/// anything else is a parse miss.
#[derive(Default)]
struct MapResolver {
    answers: HashMap<String, String>,
    unreachable: Vec<String>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl MapResolver {
    fn with(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AttributeResolver for MapResolver {
    async fn resolve(&self, model: &str) -> Resolution {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(model.to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.iter().any(|m| m == model) {
            return Resolution::NotFound(LookupError::Fetch {
                model: model.to_string(),
                message: "operation timed out".into(),
            });
        }
        match self.answers.get(model) {
            Some(v) => Resolution::Found(v.clone()),
            None => Resolution::NotFound(LookupError::Parse {
                model: model.to_string(),
                message: "no match".into(),
            }),
        }
    }
}

struct PanickingResolver;

#[async_trait]
impl AttributeResolver for PanickingResolver {
    async fn resolve(&self, model: &str) -> Resolution {
        if model == "boom" {
            panic!("connection pool exhausted");
        }
        Resolution::Found("Sedan".into())
    }
}

const INPUT: &str = "\
car_model,vehicleType,dateCrawled,dateCreated,lastSeen,kilometer
Golf,kleinwagen,2016-03-24 11:52:17,2016-03-24 00:00:00,2016-04-07 03:16:57,150000
Passat,,2016-03-14 12:52:21,2016-03-14 00:00:00,2016-04-05 12:47:46,125000
Polo,limousine,2016-03-17 16:54:04,2016-03-17 00:00:00,2016-03-17 17:40:17,70000
";

fn scraper_config(dir: &std::path::Path) -> ScraperConfig {
    let input = dir.join("autos.csv");
    fs::write(&input, INPUT).unwrap();
    ScraperConfig {
        input_file: input,
        data_path: dir.join("artifacts/scrapped_data.csv"),
        report_path: dir.join("artifacts/scrape_report.json"),
        show_progress: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn fills_only_the_missing_row_and_saves_three_rows() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path());
    let resolver = Arc::new(MapResolver::with(&[("passat", "Sedan")]));

    let outcome = run_scrape(&config, resolver.clone(), Span::none()).await.unwrap();

    let vt = outcome.table.column("vehicleType").unwrap();
    assert_eq!(
        vt,
        vec![
            &Value::text("kleinwagen"),
            &Value::text("Sedan"),
            &Value::text("limousine")
        ]
    );
    assert_eq!(outcome.rows_updated, 1);
    assert!(outcome.found.contains("passat"));
    assert!(outcome.not_found.is_empty());
    // rows that already had a value are never looked up
    assert_eq!(resolver.calls.lock().unwrap().as_slice(), ["passat".to_string()]);

    let saved = load_csv(&config.data_path, &["dateCrawled", "dateCreated", "lastSeen"]).unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved, outcome.table);

    let report = fs::read_to_string(&config.report_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["found"], serde_json::json!(["passat"]));
    assert_eq!(report["rows_updated"], 1);
}

#[tokio::test]
async fn unresolved_models_stay_null_and_are_reported() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path());
    let resolver = Arc::new(MapResolver::default());

    let outcome = run_scrape(&config, resolver, Span::none()).await.unwrap();

    assert_eq!(outcome.table.get(1, 1), &Value::Null);
    assert_eq!(outcome.not_found.iter().collect::<Vec<_>>(), ["passat"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].kind(), "parse");
    assert!(config.data_path.exists());
}

#[tokio::test]
async fn fetch_failure_leaves_row_null_and_batch_running() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("autos.csv");
    fs::write(
        &input,
        "car_model,vehicleType\nPassat,\nPolo,\nGolf,kleinwagen\n",
    )
    .unwrap();
    let config = ScraperConfig {
        input_file: input,
        data_path: dir.path().join("artifacts/scrapped_data.csv"),
        report_path: dir.path().join("artifacts/scrape_report.json"),
        show_progress: false,
        ..Default::default()
    };
    let resolver = Arc::new(MapResolver {
        unreachable: vec!["polo".to_string()],
        ..MapResolver::with(&[("passat", "Sedan")])
    });

    let outcome = run_scrape(&config, resolver, Span::none()).await.unwrap();

    assert_eq!(outcome.table.get(0, 1), &Value::text("Sedan"));
    assert_eq!(outcome.table.get(1, 1), &Value::Null);
    assert_eq!(outcome.rows_updated, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].kind(), "fetch");
    assert_eq!(outcome.failures[0].model(), "polo");

    let saved = fs::read_to_string(&config.data_path).unwrap();
    assert_eq!(saved, "car_model,vehicleType\nPassat,Sedan\nPolo,\nGolf,kleinwagen\n");

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config.report_path).unwrap()).unwrap();
    assert_eq!(report["found"], serde_json::json!(["passat"]));
    assert_eq!(report["not_found"][0]["model"], "polo");
    assert_eq!(report["not_found"][0]["kind"], "fetch");
}

fn many_models(n: usize) -> Table {
    let mut t = Table::new(["name", "vehicleType"]);
    for i in 0..n {
        // two rows per model, differing only in case
        t.push_row(vec![Value::text(format!("Model {i}")), Value::Null]).unwrap();
        t.push_row(vec![Value::text(format!("MODEL {i}")), Value::Null]).unwrap();
    }
    t
}

#[tokio::test]
async fn dispatches_each_distinct_model_once_within_the_worker_limit() {
    let answers: Vec<(String, String)> = (0..30)
        .map(|i| (format!("model {i}"), "Coupe".to_string()))
        .collect();
    let resolver = Arc::new(MapResolver {
        answers: answers.into_iter().collect(),
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    });

    let enricher = Enricher::new(resolver.clone(), 4, Span::none());
    let outcome = enricher.enrich(many_models(30)).await.unwrap();

    assert_eq!(resolver.calls.lock().unwrap().len(), 30);
    assert!(resolver.max_in_flight.load(Ordering::SeqCst) <= 4);
    assert_eq!(outcome.rows_updated, 60);
    assert!(outcome
        .table
        .column("vehicleType")
        .unwrap()
        .iter()
        .all(|v| **v == Value::text("Coupe")));
}

#[tokio::test]
async fn enriching_twice_changes_nothing_the_second_time() {
    let resolver = Arc::new(MapResolver::with(&[("model 0", "Van")]));
    let enricher = Enricher::new(resolver, 2, Span::none());

    let first = enricher.enrich(many_models(2)).await.unwrap();
    let second = enricher.enrich(first.table.clone()).await.unwrap();

    assert_eq!(second.table, first.table);
    assert_eq!(second.rows_updated, 0);
}

#[tokio::test]
async fn a_dying_worker_aborts_the_batch() {
    let mut table = Table::new(["car_model", "vehicleType"]);
    for model in ["ok", "boom", "fine"] {
        table.push_row(vec![Value::text(model), Value::Null]).unwrap();
    }

    let enricher = Enricher::new(Arc::new(PanickingResolver), 1, Span::none());
    let err = enricher.enrich(table).await.unwrap_err();
    assert!(matches!(err, PipelineError::Worker(_)));
}

#[tokio::test]
async fn missing_identifier_column_is_reported() {
    let table = Table::new(["vehicleType"]);
    let enricher = Enricher::new(Arc::new(MapResolver::default()), 1, Span::none());
    let err = enricher.enrich(table).await.unwrap_err();
    assert!(matches!(err, PipelineError::Transform { step: "build_worklist", .. }));
}

#[tokio::test]
async fn missing_input_file_fails_the_stage() {
    let dir = tempdir().unwrap();
    let config = ScraperConfig {
        input_file: dir.path().join("nope.csv"),
        data_path: dir.path().join("out.csv"),
        show_progress: false,
        ..Default::default()
    };
    let err = run_scrape(&config, Arc::new(MapResolver::default()), Span::none())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::DataLoad { .. }));
    assert!(!config.data_path.exists());
}
