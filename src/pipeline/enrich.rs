use crate::app::ports::{AttributeResolver, Resolution};
use crate::config::ScraperConfig;
use crate::constants::{DATE_COLUMNS, MODEL_COLUMNS, VEHICLE_TYPE_COLUMN};
use crate::error::{LookupError, PipelineError, Result, TableError};
use crate::storage;
use crate::table::{Table, Value};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use metrics::counter;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Result of one enrichment batch.
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub table: Table,
    pub found: BTreeSet<String>,
    pub not_found: BTreeSet<String>,
    pub failures: Vec<LookupError>,
    pub rows_updated: usize,
}

#[derive(Debug, Serialize)]
struct EnrichmentReport<'a> {
    generated_at: DateTime<Utc>,
    dispatched: usize,
    rows_updated: usize,
    found: &'a BTreeSet<String>,
    not_found: Vec<UnresolvedEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct UnresolvedEntry<'a> {
    model: &'a str,
    kind: &'static str,
    reason: String,
}

/// Fills missing body types by resolving each distinct unresolved model
/// on a bounded pool of lookup tasks.
pub struct Enricher {
    resolver: Arc<dyn AttributeResolver>,
    concurrency: usize,
    show_progress: bool,
    span: Span,
}

impl Enricher {
    pub fn new(resolver: Arc<dyn AttributeResolver>, concurrency: usize, span: Span) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
            show_progress: false,
            span,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Resolves every unresolved model and merges the results into `table`.
    ///
    /// Individual lookup failures leave the affected rows null. A lookup
    /// task that dies (panic, cancellation) aborts the whole batch.
    pub async fn enrich(&self, table: Table) -> Result<EnrichmentOutcome> {
        self.enrich_inner(table).instrument(self.span.clone()).await
    }

    async fn enrich_inner(&self, mut table: Table) -> Result<EnrichmentOutcome> {
        let (model_idx, target_idx) = lookup_columns(&table).map_err(|e| {
            error!("Cannot build the lookup worklist: {}", e);
            PipelineError::Transform {
                step: "build_worklist",
                source: e,
            }
        })?;
        let worklist = unresolved_models(&table, model_idx, target_idx);
        let total = worklist.len();
        info!(
            "Resolving {} distinct models with {} workers",
            total, self.concurrency
        );

        let progress = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}") {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for model in worklist {
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| e.to_string())?;
                    let resolution = resolver.resolve(&model).await;
                    Ok::<_, String>((model, resolution))
                }
                .instrument(Span::current()),
            );
        }

        let mut found = BTreeSet::new();
        let mut not_found = BTreeSet::new();
        let mut failures = Vec::new();
        let mut rows_updated = 0;

        // Results arrive in completion order; merging is keyed by model.
        while let Some(joined) = tasks.join_next().await {
            let (model, resolution) = match joined {
                Ok(Ok(pair)) => pair,
                Ok(Err(message)) => return Err(abort_batch(&mut tasks, &progress, message)),
                Err(join_err) => {
                    return Err(abort_batch(&mut tasks, &progress, join_err.to_string()))
                }
            };
            progress.inc(1);

            match resolution {
                Resolution::Found(vehicle_type) => {
                    counter!("autos_resolve_total", "outcome" => "found").increment(1);
                    let updated =
                        apply_resolution(&mut table, model_idx, target_idx, &model, &vehicle_type);
                    debug!("{} -> {} ({} rows)", model, vehicle_type, updated);
                    rows_updated += updated;
                    found.insert(model);
                }
                Resolution::NotFound(err) => {
                    counter!("autos_resolve_total", "outcome" => err.kind()).increment(1);
                    not_found.insert(model);
                    failures.push(err);
                }
            }
        }
        progress.finish_and_clear();

        info!("Found: {:?}", found);
        warn!("Not found: {:?}", not_found);
        info!(
            "Filled {} rows from {} resolved models ({} unresolved)",
            rows_updated,
            found.len(),
            not_found.len()
        );

        Ok(EnrichmentOutcome {
            table,
            found,
            not_found,
            failures,
            rows_updated,
        })
    }

    /// Writes the enriched table and a JSON summary of the batch.
    pub fn save(&self, outcome: &EnrichmentOutcome, data_path: &Path, report_path: &Path) -> Result<()> {
        let _enter = self.span.enter();
        storage::save_csv(&outcome.table, data_path).map_err(|e| {
            error!("{}", e);
            e
        })?;
        write_report(outcome, report_path).map_err(|e| {
            error!("{}", e);
            e
        })
    }
}

fn abort_batch(
    tasks: &mut JoinSet<std::result::Result<(String, Resolution), String>>,
    progress: &ProgressBar,
    message: String,
) -> PipelineError {
    tasks.abort_all();
    progress.abandon();
    error!("Lookup batch aborted: {}", message);
    PipelineError::Worker(message)
}

fn lookup_columns(table: &Table) -> std::result::Result<(usize, usize), TableError> {
    let model_idx = table.first_column_of(&MODEL_COLUMNS)?;
    let target_idx = table.require_column(VEHICLE_TYPE_COLUMN)?;
    Ok((model_idx, target_idx))
}

fn model_key(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string().to_lowercase())
}

/// Distinct lowercase models of rows whose body type is still missing.
pub fn unresolved_models(table: &Table, model_idx: usize, target_idx: usize) -> Vec<String> {
    table
        .rows()
        .iter()
        .filter(|row| row[target_idx].is_null())
        .filter_map(|row| model_key(&row[model_idx]))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sets the body type on every row of `model` that has none yet. Rows with
/// an existing value are never overwritten, so applying the same result
/// again changes nothing. Returns the number of rows filled.
pub fn apply_resolution(
    table: &mut Table,
    model_idx: usize,
    target_idx: usize,
    model: &str,
    vehicle_type: &str,
) -> usize {
    let mut updated = 0;
    for row in 0..table.len() {
        if !table.get(row, target_idx).is_null() {
            continue;
        }
        if model_key(table.get(row, model_idx)).as_deref() == Some(model) {
            table.set(row, target_idx, Value::text(vehicle_type));
            updated += 1;
        }
    }
    updated
}

fn write_report(outcome: &EnrichmentOutcome, path: &Path) -> Result<()> {
    let report = EnrichmentReport {
        generated_at: Utc::now(),
        dispatched: outcome.found.len() + outcome.not_found.len(),
        rows_updated: outcome.rows_updated,
        found: &outcome.found,
        not_found: outcome
            .failures
            .iter()
            .map(|f| UnresolvedEntry {
                model: f.model(),
                kind: f.kind(),
                reason: f.to_string(),
            })
            .collect(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::save(path, e))?;
    }
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json).map_err(|e| PipelineError::save(path, e))?;
    info!("Lookup report saved to {}", path.display());
    Ok(())
}

/// Scraping stage: load the input dataset, fill missing body types and
/// persist the result.
pub async fn run_scrape(
    config: &ScraperConfig,
    resolver: Arc<dyn AttributeResolver>,
    span: Span,
) -> Result<EnrichmentOutcome> {
    let table = {
        let _enter = span.enter();
        storage::load_csv(&config.input_file, &DATE_COLUMNS).map_err(|e| {
            error!("{}", e);
            e
        })?
    };

    let enricher = Enricher::new(resolver, config.concurrency, span).with_progress(config.show_progress);
    let outcome = enricher.enrich(table).await?;
    enricher.save(&outcome, &config.data_path, &config.report_path)?;
    Ok(outcome)
}
