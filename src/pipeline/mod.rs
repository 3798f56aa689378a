// Pipeline stages: body-type enrichment, ingestion/split, feature derivation

pub mod enrich;
pub mod features;
pub mod ingestion;

pub use enrich::{run_scrape, EnrichmentOutcome, Enricher};
pub use features::{derive_features, FeatureEngineer, Season};
pub use ingestion::{train_test_split, DataIngestion, IngestionOutput};
