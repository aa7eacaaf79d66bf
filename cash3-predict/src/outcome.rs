use cash3_db::models::{POSITIONS, PredictionRecord};
use serde::Serialize;

use crate::evaluate::{MatchType, classify};
use crate::history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The target draw is not in the history yet.
    Pending,
    Resolved {
        actual: [u8; POSITIONS],
        match_type: MatchType,
    },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Pending => write!(f, "pending"),
            Outcome::Resolved { match_type, .. } => write!(f, "{}", match_type),
        }
    }
}

/// Compares a logged prediction with the draw that actually happened in its target slot.
pub fn resolve_outcome(record: &PredictionRecord, history: &History) -> Outcome {
    match history.find(&record.target) {
        Some(draw) => Outcome::Resolved {
            actual: draw.digits,
            match_type: classify(&record.digits, &draw.digits),
        },
        None => Outcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::history_from;
    use crate::scorer::{ScoringOptions, predict};
    use cash3_db::models::DrawLabel;
    use chrono::Utc;

    fn record_for(history: &History, index: usize, digits: [u8; 3]) -> PredictionRecord {
        let target = history.draws()[index].slot();
        PredictionRecord {
            id: Some(1),
            created_at: Utc::now(),
            based_on: history.draws()[index - 1].slot(),
            target,
            digits,
            frequency_weight: 0.6,
            transition_weight: 0.4,
            decay_rate: None,
        }
    }

    #[test]
    fn test_resolved_exact_and_any_order() {
        let history = history_from(&[[1, 2, 3], [4, 5, 6]]);
        let exact = record_for(&history, 1, [4, 5, 6]);
        assert_eq!(
            resolve_outcome(&exact, &history),
            Outcome::Resolved { actual: [4, 5, 6], match_type: MatchType::Exact }
        );
        let shuffled = record_for(&history, 1, [6, 4, 5]);
        assert_eq!(
            resolve_outcome(&shuffled, &history),
            Outcome::Resolved { actual: [4, 5, 6], match_type: MatchType::AnyOrder }
        );
    }

    #[test]
    fn test_single_label_prediction_resolves_next_day() {
        let training = history_from(&[[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
        let record = predict(&training, &ScoringOptions::default())
            .unwrap()
            .to_record()
            .unwrap();
        assert_eq!(resolve_outcome(&record, &training), Outcome::Pending);

        let later = history_from(&[[1, 2, 3], [4, 5, 6], [7, 8, 9], [0, 1, 2]]);
        assert!(matches!(
            resolve_outcome(&record, &later),
            Outcome::Resolved { actual: [0, 1, 2], .. }
        ));
    }

    #[test]
    fn test_pending_when_target_not_drawn() {
        let history = history_from(&[[1, 2, 3], [4, 5, 6]]);
        let mut record = record_for(&history, 1, [0, 0, 0]);
        record.target.label = DrawLabel::Night;
        assert_eq!(resolve_outcome(&record, &history), Outcome::Pending);
    }
}
