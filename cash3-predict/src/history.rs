use cash3_db::models::{Draw, DrawLabel, DrawSlot};

use crate::error::{PredictError, Result};

/// Immutable, chronologically ordered (oldest first) sequence of draws,
/// unique by (date, label).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    draws: Vec<Draw>,
}

impl History {
    /// Sorts `draws` chronologically. A repeated (date, label) is rejected.
    pub fn new(mut draws: Vec<Draw>) -> Result<Self> {
        draws.sort_by_key(|d| d.slot());
        if let Some(pair) = draws.windows(2).find(|w| w[0].slot() == w[1].slot()) {
            return Err(PredictError::DuplicateDraw(pair[1].slot()));
        }
        Ok(Self { draws })
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Draw> {
        self.draws.iter()
    }

    pub fn latest(&self) -> Option<&Draw> {
        self.draws.last()
    }

    /// The last `n` draws, still oldest first.
    pub fn recent(&self, n: usize) -> &[Draw] {
        let start = self.draws.len().saturating_sub(n);
        &self.draws[start..]
    }

    /// The first `len` draws as their own history (walk-forward training sets).
    pub fn truncated(&self, len: usize) -> History {
        History {
            draws: self.draws[..len.min(self.draws.len())].to_vec(),
        }
    }

    pub fn with_label(&self, label: DrawLabel) -> History {
        History {
            draws: self.draws.iter().filter(|d| d.label == label).copied().collect(),
        }
    }

    /// Draw labels present in the history, in chronological order.
    pub fn labels(&self) -> Vec<DrawLabel> {
        DrawLabel::ALL
            .into_iter()
            .filter(|l| self.draws.iter().any(|d| d.label == *l))
            .collect()
    }

    /// Slot expected after the latest draw, stepping only through labels this history contains.
    pub fn next_slot(&self) -> Option<DrawSlot> {
        let latest = self.latest()?;
        latest.slot().next_among(&self.labels())
    }

    pub fn find(&self, slot: &DrawSlot) -> Option<&Draw> {
        self.draws
            .binary_search_by_key(slot, |d| d.slot())
            .ok()
            .map(|idx| &self.draws[idx])
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Draw;
    type IntoIter = std::slice::Iter<'a, Draw>;

    fn into_iter(self) -> Self::IntoIter {
        self.draws.iter()
    }
}
