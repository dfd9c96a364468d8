use thiserror::Error;

/// Failures raised by the analysis stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("No market data available for {0}")]
    UnknownCrop(String),

    #[error("No destinations supplied for route planning")]
    NoDestinations,

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(f64),

    #[error("Invalid farm context: {0}")]
    InvalidContext(String),
}
