use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Definitions root not found: {path}")]
    RootNotFound { path: String },

    #[error("Missing required field '{field}' in {file}")]
    MissingField { file: String, field: String },

    #[error("Duplicate {kind} definition with name {name} in {file}")]
    Duplicate {
        kind: String,
        name: String,
        file: String,
    },

    #[error("Invalid definition {file}: {reason}")]
    Invalid { file: String, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
