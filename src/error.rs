use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a single model lookup produced no body type. Recovered locally by
/// the enrichment stage; the affected rows keep a null value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("could not fetch data for {model}: {message}")]
    Fetch { model: String, message: String },

    #[error("vehicle type not found for {model}: {message}")]
    Parse { model: String, message: String },
}

impl LookupError {
    pub fn model(&self) -> &str {
        match self {
            LookupError::Fetch { model, .. } | LookupError::Parse { model, .. } => model,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Fetch { .. } => "fetch",
            LookupError::Parse { .. } => "parse",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column not found: {0}")]
    MissingColumn(String),

    #[error("row has {found} values but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to load data from {}: {source}", .path.display())]
    DataLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("transform failed at step '{step}': {source}")]
    Transform {
        step: &'static str,
        #[source]
        source: TableError,
    },

    #[error("failed to save data to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("lookup worker failed: {0}")]
    Worker(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn data_load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        PipelineError::DataLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn save(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        PipelineError::Save {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
