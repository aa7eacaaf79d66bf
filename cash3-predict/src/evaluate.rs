use serde::{Deserialize, Serialize};
use tracing::debug;

use cash3_db::models::{DrawSlot, POSITIONS};

use crate::error::{PredictError, Result};
use crate::history::History;
use crate::scorer::{ScoringOptions, predict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Same digits in the same order.
    Exact,
    /// Same multiset of digits, different order.
    AnyOrder,
    Miss,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "EXACT"),
            MatchType::AnyOrder => write!(f, "ANY ORDER"),
            MatchType::Miss => write!(f, "-"),
        }
    }
}

pub fn classify(predicted: &[u8; POSITIONS], actual: &[u8; POSITIONS]) -> MatchType {
    if predicted == actual {
        return MatchType::Exact;
    }
    let mut p = *predicted;
    let mut a = *actual;
    p.sort_unstable();
    a.sort_unstable();
    if p == a { MatchType::AnyOrder } else { MatchType::Miss }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedDraw {
    pub slot: DrawSlot,
    pub prediction: [u8; POSITIONS],
    pub actual: [u8; POSITIONS],
    pub match_type: MatchType,
    /// Number of earlier draws the prediction was trained on.
    pub training_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub window: usize,
    pub exact_matches: usize,
    pub any_order_matches: usize,
    pub misses: usize,
    pub log: Vec<EvaluatedDraw>,
}

impl AccuracyReport {
    pub fn hits(&self) -> usize {
        self.exact_matches + self.any_order_matches
    }

    pub fn hit_rate(&self) -> f64 {
        if self.log.is_empty() {
            0.0
        } else {
            self.hits() as f64 / self.log.len() as f64
        }
    }

    /// Running hit rate after each evaluated draw, for charting.
    pub fn cumulative_hit_rate(&self) -> Vec<f64> {
        let mut hits = 0usize;
        self.log
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if e.match_type != MatchType::Miss {
                    hits += 1;
                }
                hits as f64 / (i + 1) as f64
            })
            .collect()
    }
}

/// Number of walk-forward steps `evaluate_accuracy` will run for `window_size`.
pub fn effective_window(history: &History, window_size: usize) -> usize {
    window_size.min(history.len().saturating_sub(1))
}

pub fn evaluate_accuracy(
    history: &History,
    window_size: usize,
    options: &ScoringOptions,
) -> Result<AccuracyReport> {
    evaluate_accuracy_with(history, window_size, options, |_| {})
}

/// Walk-forward evaluation over the last `window_size` draws. Each draw is
/// predicted from the draws strictly before it. The oldest draw has no
/// training data, so the window is capped at `len - 1`.
pub fn evaluate_accuracy_with<F>(
    history: &History,
    window_size: usize,
    options: &ScoringOptions,
    mut on_step: F,
) -> Result<AccuracyReport>
where
    F: FnMut(&EvaluatedDraw),
{
    if history.len() < 2 {
        return Err(PredictError::InsufficientData {
            required: 2,
            available: history.len(),
        });
    }
    options.validate()?;

    let window = effective_window(history, window_size);
    let start = history.len() - window;
    debug!(window, start, "walk-forward evaluation");

    let mut report = AccuracyReport {
        window,
        exact_matches: 0,
        any_order_matches: 0,
        misses: 0,
        log: Vec::with_capacity(window),
    };

    for i in start..history.len() {
        let training = history.truncated(i);
        let prediction = predict(&training, options)?;
        let actual = &history.draws()[i];
        let match_type = classify(&prediction.digits, &actual.digits);

        match match_type {
            MatchType::Exact => report.exact_matches += 1,
            MatchType::AnyOrder => report.any_order_matches += 1,
            MatchType::Miss => report.misses += 1,
        }

        let entry = EvaluatedDraw {
            slot: actual.slot(),
            prediction: prediction.digits,
            actual: actual.digits,
            match_type,
            training_size: training.len(),
        };
        on_step(&entry);
        report.log.push(entry);
    }

    Ok(report)
}
