use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cash3_db::models::{DIGITS, Draw, DrawLabel, DrawSlot, POSITIONS, format_triplet};

use crate::history::History;

pub const SUMMARY_TOP_TRIPLETS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripletCount {
    pub triplet: String,
    pub count: u32,
    pub last_seen: Option<NaiveDate>,
}

/// Most frequent triplets, optionally restricted to one draw label.
/// Ties are ordered by triplet value.
pub fn top_triplets(history: &History, label: Option<DrawLabel>, n: usize) -> Vec<TripletCount> {
    let mut counts: HashMap<[u8; POSITIONS], (u32, NaiveDate)> = HashMap::new();
    for draw in history.iter().filter(|d| label.is_none_or(|l| d.label == l)) {
        let entry = counts.entry(draw.digits).or_insert((0, draw.date));
        entry.0 += 1;
        // Ascending history: the latest occurrence wins.
        entry.1 = draw.date;
    }

    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.0.cmp(&b.0)));

    sorted
        .into_iter()
        .take(n)
        .map(|(digits, (count, last_seen))| TripletCount {
            triplet: format_triplet(&digits),
            count,
            last_seen: Some(last_seen),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInsight {
    pub common: Option<u8>,
    pub uncommon: Option<u8>,
}

/// Most and least common digit per position over the last `window` draws.
/// Only digits that actually appeared are candidates; ties go to the smaller digit.
pub fn position_insights(history: &History, window: usize) -> [PositionInsight; POSITIONS] {
    let counts = position_counts(history.recent(window));

    let mut insights = [PositionInsight { common: None, uncommon: None }; POSITIONS];
    for (pos, insight) in insights.iter_mut().enumerate() {
        let row = &counts[pos];
        let seen: Vec<usize> = (0..DIGITS).filter(|&d| row[d] > 0).collect();
        // max_by_key keeps the last maximum, min_by_key the first minimum.
        insight.common = seen.iter().rev().max_by_key(|&&d| row[d]).map(|&d| d as u8);
        insight.uncommon = seen.iter().min_by_key(|&&d| row[d]).map(|&d| d as u8);
    }
    insights
}

fn position_counts(draws: &[Draw]) -> [[u32; DIGITS]; POSITIONS] {
    let mut counts = [[0u32; DIGITS]; POSITIONS];
    for draw in draws {
        for (pos, &d) in draw.digits.iter().enumerate() {
            counts[pos][d as usize] += 1;
        }
    }
    counts
}

/// Derived statistics snapshot. Regenerable from history at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_draws: usize,
    pub latest_draw: Option<DrawSlot>,
    pub top_triplets: Vec<TripletCount>,
    pub digit_position_counts: [[u32; DIGITS]; POSITIONS],
    pub overall_digit_counts: [u32; DIGITS],
    pub last_updated: DateTime<Utc>,
}

pub fn build_summary(history: &History, now: DateTime<Utc>) -> Summary {
    let digit_position_counts = position_counts(history.draws());
    let mut overall_digit_counts = [0u32; DIGITS];
    for row in &digit_position_counts {
        for (d, &c) in row.iter().enumerate() {
            overall_digit_counts[d] += c;
        }
    }

    Summary {
        total_draws: history.len(),
        latest_draw: history.latest().map(|d| d.slot()),
        top_triplets: top_triplets(history, None, SUMMARY_TOP_TRIPLETS),
        digit_position_counts,
        overall_digit_counts,
        last_updated: now,
    }
}
