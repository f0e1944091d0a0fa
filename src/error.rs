use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid symbol graph: {0}")]
    InvalidGraph(String),

    #[error("Index invariant violated: {0}")]
    Invariant(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No Apex sources found: {0}")]
    NoSources(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
