use cash3_db::models::{DIGITS, POSITIONS};
use serde::Serialize;

use crate::error::{PredictError, Result};
use crate::history::History;

/// Weight per (position, digit). Positions are 0-based indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    weights: [[f64; DIGITS]; POSITIONS],
}

impl FrequencyTable {
    pub fn weight(&self, position: usize, digit: u8) -> f64 {
        self.weights[position][digit as usize]
    }

    pub fn position(&self, position: usize) -> &[f64; DIGITS] {
        &self.weights[position]
    }

    pub fn max_weight(&self, position: usize) -> f64 {
        self.weights[position].iter().copied().fold(0.0, f64::max)
    }

    /// Weight scaled by the position's maximum, in [0, 1]. Zero when nothing was observed.
    pub fn normalized(&self, position: usize, digit: u8) -> f64 {
        let max = self.max_weight(position);
        if max > 0.0 {
            self.weight(position, digit) / max
        } else {
            0.0
        }
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().flatten().sum()
    }
}

pub fn check_decay_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(PredictError::InvalidDecayRate(rate))
    }
}

/// Counts each digit at each position. With `decay_rate`, a draw `age` steps
/// before the most recent one contributes `decay_rate^age` instead of 1.
pub fn compute_frequencies(history: &History, decay_rate: Option<f64>) -> FrequencyTable {
    let mut weights = [[0.0f64; DIGITS]; POSITIONS];
    let n = history.len();

    for (i, draw) in history.iter().enumerate() {
        let age = n - 1 - i;
        let contribution = match decay_rate {
            Some(rate) => rate.powi(age as i32),
            None => 1.0,
        };
        for (pos, &digit) in draw.digits.iter().enumerate() {
            weights[pos][digit as usize] += contribution;
        }
    }

    FrequencyTable { weights }
}
