use cash3_db::models::DrawSlot;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("not enough history: need at least {required} draw(s), have {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("duplicate draw for {0}")]
    DuplicateDraw(DrawSlot),
    #[error("decay rate {0} outside (0, 1]")]
    InvalidDecayRate(f64),
    #[error("invalid scoring weights (frequency={frequency}, transition={transition})")]
    InvalidWeights { frequency: f64, transition: f64 },
    #[error("sampling failed: {0}")]
    Sampling(String),
}

pub type Result<T, E = PredictError> = std::result::Result<T, E>;
