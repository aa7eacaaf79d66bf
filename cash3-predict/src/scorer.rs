use cash3_db::models::{DIGITS, DrawSlot, POSITIONS, PredictionRecord, format_triplet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PredictError, Result};
use crate::history::History;
use crate::models::frequency::{check_decay_rate, compute_frequencies};
use crate::models::transition::compute_transitions;

pub const DEFAULT_FREQUENCY_WEIGHT: f64 = 0.6;
pub const DEFAULT_TRANSITION_WEIGHT: f64 = 0.4;
pub const DEFAULT_DECAY_RATE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub frequency: f64,
    pub transition: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY_WEIGHT,
            transition: DEFAULT_TRANSITION_WEIGHT,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let ok = |w: f64| w.is_finite() && w >= 0.0;
        if !ok(self.frequency) || !ok(self.transition) || self.frequency + self.transition == 0.0 {
            return Err(PredictError::InvalidWeights {
                frequency: self.frequency,
                transition: self.transition,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringOptions {
    pub weights: ScoringWeights,
    /// `None` counts every draw equally.
    pub decay_rate: Option<f64>,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            decay_rate: Some(DEFAULT_DECAY_RATE),
        }
    }
}

impl ScoringOptions {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if let Some(rate) = self.decay_rate {
            check_decay_rate(rate)?;
        }
        Ok(())
    }
}

pub type ScoreTable = [[f64; DIGITS]; POSITIONS];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub digits: [u8; POSITIONS],
    pub scores: ScoreTable,
    pub options: ScoringOptions,
    /// Most recent draw the prediction was computed from.
    pub based_on: DrawSlot,
    /// Slot the prediction is for.
    pub target: Option<DrawSlot>,
    pub generated_at: DateTime<Utc>,
}

impl Prediction {
    pub fn triplet(&self) -> String {
        format_triplet(&self.digits)
    }

    pub fn to_record(&self) -> Option<PredictionRecord> {
        let target = self.target?;
        Some(PredictionRecord {
            id: None,
            created_at: self.generated_at,
            based_on: self.based_on,
            target,
            digits: self.digits,
            frequency_weight: self.options.weights.frequency,
            transition_weight: self.options.weights.transition,
            decay_rate: self.options.decay_rate,
        })
    }
}

/// Combined frequency and transition score for every (position, digit).
///
/// `score = w_freq * freq / max_freq + w_trans * P(last -> digit)`, where `last`
/// is the digit at that position in the most recent draw. Unobserved
/// transitions contribute 0, so a single-draw history is scored on frequency alone.
pub fn score_table(history: &History, options: &ScoringOptions) -> Result<ScoreTable> {
    options.validate()?;
    let latest = history.latest().ok_or(PredictError::InsufficientData {
        required: 1,
        available: 0,
    })?;

    let frequencies = compute_frequencies(history, options.decay_rate);
    let transitions = compute_transitions(history);
    let w = options.weights;

    let mut scores = [[0.0f64; DIGITS]; POSITIONS];
    for (pos, row) in scores.iter_mut().enumerate() {
        let last = latest.digits[pos];
        for (digit, score) in row.iter_mut().enumerate() {
            let digit = digit as u8;
            let freq = frequencies.normalized(pos, digit);
            let trans = transitions.probability(pos, last, digit).unwrap_or(0.0);
            *score = w.frequency * freq + w.transition * trans;
        }
    }
    Ok(scores)
}

/// Highest-scoring digit; ties go to the smallest digit.
pub fn argmax_digit(scores: &[f64; DIGITS]) -> u8 {
    let mut best = 0usize;
    for (digit, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = digit;
        }
    }
    best as u8
}

/// Deterministic prediction: arg-max per position.
pub fn predict(history: &History, options: &ScoringOptions) -> Result<Prediction> {
    let scores = score_table(history, options)?;
    let based_on = history
        .latest()
        .map(|d| d.slot())
        .ok_or(PredictError::InsufficientData { required: 1, available: 0 })?;

    let mut digits = [0u8; POSITIONS];
    for (pos, digit) in digits.iter_mut().enumerate() {
        *digit = argmax_digit(&scores[pos]);
    }
    debug!(draws = history.len(), based_on = %based_on, triplet = %format_triplet(&digits), "prediction");

    Ok(Prediction {
        digits,
        scores,
        options: *options,
        based_on,
        target: history.next_slot(),
        generated_at: Utc::now(),
    })
}
