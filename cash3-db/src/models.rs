use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of digit positions in a Cash 3 draw.
pub const POSITIONS: usize = 3;
/// Number of distinct digits per position (0-9).
pub const DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DrawLabel {
    Midday,
    Evening,
    Night,
}

impl DrawLabel {
    pub const ALL: [DrawLabel; 3] = [DrawLabel::Midday, DrawLabel::Evening, DrawLabel::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrawLabel::Midday => "Midday",
            DrawLabel::Evening => "Evening",
            DrawLabel::Night => "Night",
        }
    }

    /// Scheduled draw time (Eastern).
    pub fn draw_time(&self) -> &'static str {
        match self {
            DrawLabel::Midday => "12:20 PM",
            DrawLabel::Evening => "6:59 PM",
            DrawLabel::Night => "11:34 PM",
        }
    }

    /// Lenient match used on scraped exports: "MIDDAY", "mid-day", "Evening draw", "night"...
    pub fn parse_loose(raw: &str) -> Option<DrawLabel> {
        let low = raw.trim().to_lowercase();
        if low.contains("mid") {
            Some(DrawLabel::Midday)
        } else if low.contains("even") {
            Some(DrawLabel::Evening)
        } else if low.contains("night") {
            Some(DrawLabel::Night)
        } else {
            None
        }
    }
}

impl fmt::Display for DrawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError(String);

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown draw label '{}'", self.0)
    }
}

impl std::error::Error for ParseLabelError {}

impl FromStr for DrawLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "midday" => Ok(DrawLabel::Midday),
            "evening" => Ok(DrawLabel::Evening),
            "night" => Ok(DrawLabel::Night),
            _ => Err(ParseLabelError(s.to_string())),
        }
    }
}

/// A (date, label) pair. Orders chronologically: by date, then Midday < Evening < Night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DrawSlot {
    pub date: NaiveDate,
    pub label: DrawLabel,
}

impl DrawSlot {
    pub fn new(date: NaiveDate, label: DrawLabel) -> Self {
        Self { date, label }
    }

    /// The slot drawn right after this one. `None` only at the end of the calendar.
    pub fn next(&self) -> Option<DrawSlot> {
        self.next_among(&DrawLabel::ALL)
    }

    /// Next slot when only `labels` are ever drawn: the following label the same
    /// day, else the earliest label the next day. Empty `labels` means all of them.
    pub fn next_among(&self, labels: &[DrawLabel]) -> Option<DrawSlot> {
        let labels = if labels.is_empty() { &DrawLabel::ALL[..] } else { labels };
        if let Some(&label) = labels.iter().filter(|&&l| l > self.label).min() {
            return Some(DrawSlot::new(self.date, label));
        }
        let first = labels.iter().min().copied()?;
        self.date.succ_opt().map(|d| DrawSlot::new(d, first))
    }
}

impl fmt::Display for DrawSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Draw {
    pub date: NaiveDate,
    pub label: DrawLabel,
    pub digits: [u8; POSITIONS],
}

impl Draw {
    pub fn new(date: NaiveDate, label: DrawLabel, digits: [u8; POSITIONS]) -> Result<Self> {
        validate_digits(&digits)?;
        Ok(Self { date, label, digits })
    }

    pub fn slot(&self) -> DrawSlot {
        DrawSlot::new(self.date, self.label)
    }

    pub fn triplet(&self) -> String {
        format_triplet(&self.digits)
    }
}

/// A prediction as stored in the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub based_on: DrawSlot,
    pub target: DrawSlot,
    pub digits: [u8; POSITIONS],
    pub frequency_weight: f64,
    pub transition_weight: f64,
    pub decay_rate: Option<f64>,
}

pub fn validate_digits(digits: &[u8; POSITIONS]) -> Result<()> {
    for (pos, &d) in digits.iter().enumerate() {
        if d as usize >= DIGITS {
            bail!("Digit {} at position {} out of range (0-9)", d, pos + 1);
        }
    }
    Ok(())
}

pub fn format_triplet(digits: &[u8; POSITIONS]) -> String {
    digits.iter().map(|d| d.to_string()).collect()
}
