use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeagrassError {
    #[error("Malformed survey data: {0}")]
    DataFormat(String),

    #[error("No survey records to map{}", .0.as_ref().map(|p| format!(" in {:?}", p)).unwrap_or_default())]
    EmptyDataset(Option<PathBuf>),

    #[error("Projection failed: {0}")]
    Projection(String),

    #[error("Failed to write {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to serialise map data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render map page: {0}")]
    Template(#[from] tera::Error),
}

pub type Result<T> = std::result::Result<T, SeagrassError>;
