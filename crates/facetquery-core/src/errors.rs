use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("cursor paging requires an idField to break sort ties")]
    MissingIdField,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
