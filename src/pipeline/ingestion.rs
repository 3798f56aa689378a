use crate::config::IngestionConfig;
use crate::constants::DATE_COLUMNS;
use crate::error::{PipelineError, Result};
use crate::storage;
use crate::table::Table;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{error, info, Span};

#[derive(Debug, Clone)]
pub struct IngestionOutput {
    pub train: Table,
    pub test: Table,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub raw_path: PathBuf,
}

/// Shuffles row positions with a seeded RNG; the first
/// `ceil(len * test_size)` shuffled rows form the test partition and the
/// rest the training partition. Identical input and seed always give
/// identical partitions.
pub fn train_test_split(table: &Table, test_size: f64, seed: u64) -> (Table, Table) {
    let mut order: Vec<usize> = (0..table.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let n_test = ((table.len() as f64) * test_size).ceil() as usize;
    let n_test = n_test.min(table.len());
    let (test_idx, train_idx) = order.split_at(n_test);
    (table.select_rows(train_idx), table.select_rows(test_idx))
}

pub struct DataIngestion {
    config: IngestionConfig,
    span: Span,
}

impl DataIngestion {
    pub fn new(config: IngestionConfig, span: Span) -> Self {
        Self { config, span }
    }

    /// Loads the enriched dataset, writes it back unchanged as the raw
    /// snapshot, then writes the seeded train/test partitions. Any failure
    /// is logged and returned wrapped as an ingestion stage error.
    pub fn run(&self) -> Result<IngestionOutput> {
        let _enter = self.span.enter();
        info!("Data Ingestion started");
        self.ingest().map_err(|e| {
            error!("{}", e);
            PipelineError::Stage {
                stage: "ingestion",
                source: Box::new(e),
            }
        })
    }

    fn ingest(&self) -> Result<IngestionOutput> {
        let c = &self.config;
        let table = storage::load_csv(&c.scraped_data_path, &DATE_COLUMNS)?;
        info!("Read the scraped dataset ({} rows)", table.len());

        storage::save_csv(&table, &c.raw_data_path)?;

        info!("Train test split started");
        let (train, test) = train_test_split(&table, c.test_size, c.seed);
        storage::save_csv(&train, &c.train_data_path)?;
        storage::save_csv(&test, &c.test_data_path)?;
        info!(
            "Ingestion of data is completed: {} train rows, {} test rows",
            train.len(),
            test.len()
        );

        Ok(IngestionOutput {
            train,
            test,
            train_path: c.train_data_path.clone(),
            test_path: c.test_data_path.clone(),
            raw_path: c.raw_data_path.clone(),
        })
    }
}
