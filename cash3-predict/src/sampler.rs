use chrono::Datelike;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use cash3_db::models::{DIGITS, POSITIONS, format_triplet};

use crate::error::{PredictError, Result};
use crate::history::History;
use crate::scorer::{ScoringOptions, score_table};

/// Deterministic seed derived from today's date (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    let y = today.year() as u64;
    let m = today.month() as u64;
    let d = today.day() as u64;
    y * 10_000 + m * 100 + d
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub digits: [u8; POSITIONS],
    /// Product over positions of (sampling probability / uniform probability).
    pub lift: f64,
}

impl Suggestion {
    pub fn triplet(&self) -> String {
        format_triplet(&self.digits)
    }
}

enum PositionSampler {
    Weighted(WeightedIndex<f64>, [f64; DIGITS]),
    Uniform,
}

impl PositionSampler {
    fn new(scores: &[f64; DIGITS]) -> Result<Self> {
        let total: f64 = scores.iter().sum();
        if total <= 0.0 {
            return Ok(PositionSampler::Uniform);
        }
        let dist = WeightedIndex::new(scores).map_err(|e| PredictError::Sampling(e.to_string()))?;
        let mut probs = [0.0f64; DIGITS];
        for (p, &s) in probs.iter_mut().zip(scores) {
            *p = s / total;
        }
        Ok(PositionSampler::Weighted(dist, probs))
    }

    fn sample(&self, rng: &mut StdRng) -> (u8, f64) {
        match self {
            PositionSampler::Weighted(dist, probs) => {
                let idx = dist.sample(rng);
                (idx as u8, probs[idx])
            }
            PositionSampler::Uniform => (rng.random_range(0..DIGITS) as u8, 1.0 / DIGITS as f64),
        }
    }
}

/// Stochastic triplets: each position drawn independently with probability
/// proportional to its score. Same history, options and seed give the same output.
pub fn generate_suggestions(
    history: &History,
    options: &ScoringOptions,
    count: usize,
    seed: u64,
) -> Result<Vec<Suggestion>> {
    let scores = score_table(history, options)?;
    let samplers = scores
        .iter()
        .map(PositionSampler::new)
        .collect::<Result<Vec<_>>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let uniform = 1.0 / DIGITS as f64;

    let mut suggestions = Vec::with_capacity(count);
    for _ in 0..count {
        let mut digits = [0u8; POSITIONS];
        let mut lift = 1.0f64;
        for (pos, sampler) in samplers.iter().enumerate() {
            let (digit, prob) = sampler.sample(&mut rng);
            digits[pos] = digit;
            lift *= prob / uniform;
        }
        suggestions.push(Suggestion { digits, lift });
    }

    Ok(suggestions)
}
