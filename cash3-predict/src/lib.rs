pub mod error;
pub mod evaluate;
pub mod history;
pub mod insights;
pub mod models;
pub mod outcome;
pub mod sampler;
pub mod scorer;

pub use error::PredictError;
pub use history::History;
