use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("API error: {0}")]
    ApiError(String),
}
