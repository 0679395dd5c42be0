use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("{0}")]
    DataUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl InsightsError {
    /// HTTP status the API layer reports for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            InsightsError::Validation(_) => 400,
            InsightsError::NotFound(_) => 404,
            InsightsError::DataUnavailable(_)
            | InsightsError::Computation(_)
            | InsightsError::Llm(_)
            | InsightsError::Polars(_) => 500,
        }
    }

    pub fn missing_column(name: &str) -> Self {
        InsightsError::Computation(format!("column '{}' not found in sales data", name))
    }
}

impl From<polars::error::PolarsError> for InsightsError {
    fn from(err: polars::error::PolarsError) -> Self {
        InsightsError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;
