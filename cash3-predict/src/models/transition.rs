use cash3_db::models::{DIGITS, POSITIONS};

use crate::history::History;

/// Per-position first-order transitions between consecutive draws.
///
/// `row(pos, from)` is the distribution of the digit seen at `pos` right after
/// `from` appeared there. Rows never observed are absent: a lookup returns
/// `None`, which callers treat as "no information" rather than zero for all digits.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    counts: [[[u32; DIGITS]; DIGITS]; POSITIONS],
    rows: [[Option<[f64; DIGITS]>; DIGITS]; POSITIONS],
}

impl TransitionTable {
    pub fn row(&self, position: usize, from: u8) -> Option<&[f64; DIGITS]> {
        self.rows[position][from as usize].as_ref()
    }

    pub fn probability(&self, position: usize, from: u8, to: u8) -> Option<f64> {
        self.row(position, from).map(|row| row[to as usize])
    }

    pub fn count(&self, position: usize, from: u8, to: u8) -> u32 {
        self.counts[position][from as usize][to as usize]
    }

    pub fn observed_rows(&self) -> usize {
        self.rows.iter().flatten().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.observed_rows() == 0
    }
}

pub fn compute_transitions(history: &History) -> TransitionTable {
    let mut counts = [[[0u32; DIGITS]; DIGITS]; POSITIONS];

    for pair in history.draws().windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        for pos in 0..POSITIONS {
            counts[pos][prev.digits[pos] as usize][next.digits[pos] as usize] += 1;
        }
    }

    let mut rows: [[Option<[f64; DIGITS]>; DIGITS]; POSITIONS] = [[None; DIGITS]; POSITIONS];
    for pos in 0..POSITIONS {
        for from in 0..DIGITS {
            let total: u32 = counts[pos][from].iter().sum();
            if total == 0 {
                continue;
            }
            let mut row = [0.0f64; DIGITS];
            for (to, p) in row.iter_mut().enumerate() {
                *p = counts[pos][from][to] as f64 / total as f64;
            }
            rows[pos][from] = Some(row);
        }
    }

    TransitionTable { counts, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::{history_from, make_test_history};

    #[test]
    fn test_fewer_than_two_draws_is_empty() {
        assert!(compute_transitions(&History::default()).is_empty());
        assert!(compute_transitions(&history_from(&[[1, 2, 3]])).is_empty());
    }

    #[test]
    fn test_scenario_position_three() {
        let history = history_from(&[[1, 2, 3], [1, 2, 4], [1, 2, 3]]);
        let table = compute_transitions(&history);

        assert_eq!(table.count(2, 3, 4), 1);
        assert_eq!(table.count(2, 4, 3), 1);
        assert_eq!(table.probability(2, 3, 4), Some(1.0));
        assert_eq!(table.probability(2, 4, 3), Some(1.0));
        assert_eq!(table.probability(2, 3, 3), Some(0.0));
        assert_eq!(table.probability(2, 5, 3), None);

        // Position 1 only ever goes 1 -> 1
        assert_eq!(table.count(0, 1, 1), 2);
        assert_eq!(table.probability(0, 1, 1), Some(1.0));
    }

    #[test]
    fn test_rows_sum_to_one() {
        let table = compute_transitions(&make_test_history(60));
        assert!(!table.is_empty());
        for pos in 0..POSITIONS {
            for from in 0..DIGITS as u8 {
                if let Some(row) = table.row(pos, from) {
                    let sum: f64 = row.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-9, "pos={} from={} sum={}", pos, from, sum);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let history = make_test_history(35);
        assert_eq!(compute_transitions(&history), compute_transitions(&history));
    }
}
