use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use cash3_db::db::insert_draw;
use cash3_db::models::{Draw, DrawLabel, POSITIONS};
use cash3_db::rusqlite::Connection;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%A, %B %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.date());
        }
    }
    bail!("Invalid date: '{}'", raw)
}

/// "Midday", "MIDDAY", "mid-day" or a scheduled time such as "6:59 PM".
pub fn parse_label(raw: &str) -> Result<DrawLabel> {
    if let Some(label) = DrawLabel::parse_loose(raw) {
        return Ok(label);
    }
    let raw = raw.trim();
    DrawLabel::ALL
        .into_iter()
        .find(|l| l.draw_time().eq_ignore_ascii_case(raw))
        .with_context(|| format!("Unknown draw label: '{}'", raw))
}

fn parse_digit(raw: &str) -> Result<u8> {
    let s = raw.trim();
    // Spreadsheet exports sometimes write integers as "4.0"
    let s = s.strip_suffix(".0").unwrap_or(s);
    let digit = s
        .parse::<u8>()
        .with_context(|| format!("Not a digit: '{}'", raw.trim()))?;
    if digit > 9 {
        bail!("Digit {} out of range (0-9)", digit);
    }
    Ok(digit)
}

/// Combined winning numbers: "1-2-3", "1 2 3", "123", or "7" (zero padded to "007").
pub fn parse_combined(raw: &str) -> Result<[u8; POSITIONS]> {
    let trimmed = raw.trim();
    let tokens: Vec<&str> = trimmed
        .strip_suffix(".0")
        .unwrap_or(trimmed)
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .collect();

    let chars: Vec<char> = match tokens.as_slice() {
        [a, b, c] if a.len() == 1 && b.len() == 1 && c.len() == 1 => {
            tokens.iter().flat_map(|t| t.chars()).collect()
        }
        [single] if single.len() <= POSITIONS => {
            format!("{:0>width$}", single, width = POSITIONS).chars().collect()
        }
        _ => bail!("Cannot read three digits from '{}'", raw.trim()),
    };

    let mut digits = [0u8; POSITIONS];
    for (slot, c) in digits.iter_mut().zip(chars) {
        *slot = c as u8 - b'0';
    }
    Ok(digits)
}

#[derive(Debug, Clone, PartialEq)]
enum DigitColumns {
    Split([usize; POSITIONS]),
    Combined(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Columns {
    date: usize,
    label: Option<usize>,
    digits: DigitColumns,
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn find_split(headers: &csv::StringRecord, prefix: &str) -> Option<[usize; POSITIONS]> {
    let mut idx = [0usize; POSITIONS];
    for (i, slot) in idx.iter_mut().enumerate() {
        let name = format!("{}{}", prefix, i + 1);
        *slot = find_column(headers, &[name.as_str()])?;
    }
    Some(idx)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<Columns> {
    let date = find_column(headers, &["Date", "DrawDate"])
        .context("No date column (expected 'Date' or 'DrawDate')")?;
    let label = find_column(headers, &["Draw"]).or_else(|| find_column(headers, &["DrawTime"]));

    let digits = if let Some(idx) = find_split(headers, "Digit") {
        DigitColumns::Split(idx)
    } else if let Some(idx) = find_split(headers, "Number") {
        DigitColumns::Split(idx)
    } else if let Some(idx) = find_column(headers, &["WinningNumbers", "Number"]) {
        DigitColumns::Combined(idx)
    } else {
        bail!("No digit columns (expected Digit1-3, Number1-3, WinningNumbers or Number)");
    };

    Ok(Columns { date, label, digits })
}

fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Result<Draw> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .with_context(|| format!("Missing field at index {}", idx))
    };

    let date = parse_date(get(columns.date)?)?;
    let label = match columns.label {
        Some(idx) => parse_label(get(idx)?)?,
        None => DrawLabel::Midday,
    };
    let digits = match &columns.digits {
        DigitColumns::Split(idx) => [
            parse_digit(get(idx[0])?)?,
            parse_digit(get(idx[1])?)?,
            parse_digit(get(idx[2])?)?,
        ],
        DigitColumns::Combined(idx) => parse_combined(get(*idx)?)?,
    };

    Draw::new(date, label, digits)
}

#[derive(Debug, Default)]
pub struct ParsedRows {
    pub draws: Vec<Draw>,
    pub total_records: u32,
    pub errors: u32,
}

/// Normalizes every row into a `Draw`. Malformed rows are logged and counted, never returned.
pub fn parse_rows<R: io::Read>(reader: &mut csv::Reader<R>) -> Result<ParsedRows> {
    let headers = reader.headers().context("Cannot read CSV header")?.clone();
    let columns = resolve_columns(&headers)?;
    debug!(?columns, "resolved CSV columns");
    if columns.label.is_none() {
        warn!("no Draw/DrawTime column, every row is imported as Midday");
    }

    let mut parsed = ParsedRows::default();
    for record_result in reader.records() {
        parsed.total_records += 1;
        // Header is line 1
        let line = parsed.total_records + 1;
        match record_result {
            Ok(record) => match parse_record(&record, &columns) {
                Ok(draw) => parsed.draws.push(draw),
                Err(e) => {
                    warn!(line, error = %e, "skipping malformed row");
                    parsed.errors += 1;
                }
            },
            Err(e) => {
                warn!(line, error = %e, "unreadable row");
                parsed.errors += 1;
            }
        }
    }
    Ok(parsed)
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;

    let parsed = parse_rows(&mut reader)?;

    let tx = conn.unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: parsed.total_records,
        inserted: 0,
        skipped: 0,
        errors: parsed.errors,
    };

    for draw in &parsed.draws {
        match insert_draw(&tx, draw) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.skipped += 1,
            Err(e) => {
                warn!(slot = %draw.slot(), error = %e, "insert failed");
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cash3_db::db::{count_draws, fetch_history, migrate};
    use std::io::Write;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-07-25").unwrap(), date(2024, 7, 25));
        assert_eq!(parse_date("07/25/2024").unwrap(), date(2024, 7, 25));
        assert_eq!(parse_date("Thursday, July 25, 2024").unwrap(), date(2024, 7, 25));
        assert_eq!(parse_date("2024-07-25 00:00:00").unwrap(), date(2024, 7, 25));
        assert!(parse_date("25/07/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("MIDDAY").unwrap(), DrawLabel::Midday);
        assert_eq!(parse_label("evening").unwrap(), DrawLabel::Evening);
        assert_eq!(parse_label("11:34 PM").unwrap(), DrawLabel::Night);
        assert!(parse_label("Brunch").is_err());
    }

    #[test]
    fn test_parse_combined() {
        assert_eq!(parse_combined("1-2-3").unwrap(), [1, 2, 3]);
        assert_eq!(parse_combined("4 0 9").unwrap(), [4, 0, 9]);
        assert_eq!(parse_combined("808").unwrap(), [8, 0, 8]);
        assert_eq!(parse_combined("7").unwrap(), [0, 0, 7]);
        assert_eq!(parse_combined("42").unwrap(), [0, 4, 2]);
        assert_eq!(parse_combined("45.0").unwrap(), [0, 4, 5]);
        assert_eq!(parse_combined(" 123.0 ").unwrap(), [1, 2, 3]);
        assert!(parse_combined("1234").is_err());
        assert!(parse_combined("12 3").is_err());
        assert!(parse_combined("").is_err());
    }

    #[test]
    fn test_parse_digit() {
        assert_eq!(parse_digit(" 4 ").unwrap(), 4);
        assert_eq!(parse_digit("4.0").unwrap(), 4);
        assert!(parse_digit("10").is_err());
        assert!(parse_digit("x").is_err());
        assert!(parse_digit("-1").is_err());
    }

    #[test]
    fn test_split_digit_columns() {
        let data = "Date,Draw,DrawTime,Digit1,Digit2,Digit3\n\
                    2024-07-25,Night,11:34 PM,3,7,7\n\
                    2024-07-25,Midday,12:20 PM,0,1,2\n";
        let parsed = parse_rows(&mut reader(data)).unwrap();
        assert_eq!(parsed.total_records, 2);
        assert_eq!(parsed.errors, 0);
        assert_eq!(parsed.draws[0].digits, [3, 7, 7]);
        assert_eq!(parsed.draws[0].label, DrawLabel::Night);
        assert_eq!(parsed.draws[1].label, DrawLabel::Midday);
    }

    #[test]
    fn test_number_columns_and_lowercase_labels() {
        let data = "Date,Draw,Number1,Number2,Number3\n\
                    2024-01-02,evening,9,9,1\n";
        let parsed = parse_rows(&mut reader(data)).unwrap();
        assert_eq!(parsed.draws[0].digits, [9, 9, 1]);
        assert_eq!(parsed.draws[0].label, DrawLabel::Evening);
    }

    #[test]
    fn test_combined_number_column_without_label() {
        let data = "DrawDate,Number\n01/05/2024,45\n01/06/2024,123\n";
        let parsed = parse_rows(&mut reader(data)).unwrap();
        assert_eq!(parsed.draws.len(), 2);
        assert_eq!(parsed.draws[0].digits, [0, 4, 5]);
        assert_eq!(parsed.draws[0].label, DrawLabel::Midday);
        assert_eq!(parsed.draws[1].date, date(2024, 1, 6));
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let data = "Date,Draw,Digit1,Digit2,Digit3\n\
                    2024-01-01,Midday,1,2,3\n\
                    not-a-date,Midday,1,2,3\n\
                    2024-01-02,Brunch,1,2,3\n\
                    2024-01-03,Night,1,12,3\n\
                    2024-01-04,Night,a,2,3\n\
                    2024-01-05,Night,1,2\n\
                    2024-01-06,Evening,4,5,6\n";
        let parsed = parse_rows(&mut reader(data)).unwrap();
        assert_eq!(parsed.total_records, 7);
        assert_eq!(parsed.errors, 5);
        assert_eq!(parsed.draws.len(), 2);
    }

    #[test]
    fn test_missing_digit_columns_is_an_error() {
        let data = "Date,Draw,Jackpot\n2024-01-01,Midday,500\n";
        assert!(parse_rows(&mut reader(data)).is_err());
    }

    #[test]
    fn test_import_csv_deduplicates() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,Draw,Digit1,Digit2,Digit3\n\
             2024-01-02,Midday,1,2,4\n\
             2024-01-01,Midday,1,2,3\n\
             2024-01-01,Midday,9,9,9\n\
             bad,Midday,1,2,3\n"
        )
        .unwrap();

        let result = import_csv(&conn, file.path()).unwrap();
        assert_eq!(result.total_records, 4);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(count_draws(&conn).unwrap(), 2);

        // Re-importing the same file adds nothing
        let again = import_csv(&conn, file.path()).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 3);

        let history = fetch_history(&conn).unwrap();
        assert_eq!(history[0].digits, [1, 2, 3]);
    }

    #[test]
    fn test_unlabeled_import_predicts_and_resolves_next_day() {
        use cash3_db::db::{append_prediction, fetch_predictions};
        use cash3_predict::History;
        use cash3_predict::outcome::{Outcome, resolve_outcome};
        use cash3_predict::scorer::{ScoringOptions, predict};

        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let mut first = tempfile::NamedTempFile::new().unwrap();
        write!(first, "Date,WinningNumbers\n01/01/2024,1-2-3\n01/02/2024,4-5-6\n01/03/2024,7-8-9\n").unwrap();
        import_csv(&conn, first.path()).unwrap();

        let history = History::new(fetch_history(&conn).unwrap()).unwrap();
        let prediction = predict(&history, &ScoringOptions::default()).unwrap();
        let target = prediction.target.unwrap();
        assert_eq!(target.date, date(2024, 1, 4));
        assert_eq!(target.label, DrawLabel::Midday);
        append_prediction(&conn, &prediction.to_record().unwrap()).unwrap();

        let mut second = tempfile::NamedTempFile::new().unwrap();
        write!(second, "Date,WinningNumbers\n01/04/2024,0-1-2\n").unwrap();
        import_csv(&conn, second.path()).unwrap();

        let history = History::new(fetch_history(&conn).unwrap()).unwrap();
        let logged = fetch_predictions(&conn, 10).unwrap();
        assert_eq!(logged.len(), 1);
        assert!(matches!(
            resolve_outcome(&logged[0], &history),
            Outcome::Resolved { actual: [0, 1, 2], .. }
        ));
    }
}
