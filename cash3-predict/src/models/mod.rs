pub mod frequency;
pub mod transition;

#[cfg(test)]
pub(crate) mod testing {
    use cash3_db::models::{Draw, DrawLabel};
    use chrono::{Days, NaiveDate};

    use crate::history::History;

    /// One Midday draw per day starting 2024-01-01, in the given order.
    pub(crate) fn history_from(triplets: &[[u8; 3]]) -> History {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let draws = triplets
            .iter()
            .enumerate()
            .map(|(i, &digits)| Draw {
                date: start + Days::new(i as u64),
                label: DrawLabel::Midday,
                digits,
            })
            .collect();
        History::new(draws).unwrap()
    }

    pub(crate) fn make_test_history(n: usize) -> History {
        let triplets: Vec<[u8; 3]> = (0..n)
            .map(|i| [(i % 10) as u8, ((i * 3 + 1) % 10) as u8, ((i * 7 + 2) % 10) as u8])
            .collect();
        history_from(&triplets)
    }
}
