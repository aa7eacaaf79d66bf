use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use crate::models::{Draw, DrawLabel, DrawSlot, PredictionRecord};

pub const DB_FILE: &str = "cash3.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    date     TEXT NOT NULL,
    label    TEXT NOT NULL,
    digit_1  INTEGER NOT NULL,
    digit_2  INTEGER NOT NULL,
    digit_3  INTEGER NOT NULL,
    PRIMARY KEY (date, label)
);

CREATE TABLE IF NOT EXISTS predictions (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at         TEXT NOT NULL,
    based_on_date      TEXT NOT NULL,
    based_on_label     TEXT NOT NULL,
    target_date        TEXT NOT NULL,
    target_label       TEXT NOT NULL,
    digit_1            INTEGER NOT NULL,
    digit_2            INTEGER NOT NULL,
    digit_3            INTEGER NOT NULL,
    frequency_weight   REAL NOT NULL,
    transition_weight  REAL NOT NULL,
    decay_rate         REAL
);
";

// Label text does not sort chronologically.
const LABEL_RANK: &str = "CASE label WHEN 'Midday' THEN 0 WHEN 'Evening' THEN 1 ELSE 2 END";

impl ToSql for DrawLabel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DrawLabel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (date, label, digit_1, digit_2, digit_3)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            draw.date,
            draw.label,
            draw.digits[0],
            draw.digits[1],
            draw.digits[2],
        ],
    ).context("Insert failed")?;
    Ok(changed > 0)
}

fn row_to_draw(row: &Row<'_>) -> rusqlite::Result<Draw> {
    Ok(Draw {
        date: row.get(0)?,
        label: row.get(1)?,
        digits: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
        ],
    })
}

/// Every stored draw, oldest first.
pub fn fetch_history(conn: &Connection) -> Result<Vec<Draw>> {
    let sql = format!(
        "SELECT date, label, digit_1, digit_2, digit_3
         FROM draws ORDER BY date ASC, {LABEL_RANK} ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map([], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// The `limit` most recent draws, newest first.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let sql = format!(
        "SELECT date, label, digit_1, digit_2, digit_3
         FROM draws ORDER BY date DESC, {LABEL_RANK} DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map([limit], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn find_draw(conn: &Connection, slot: &DrawSlot) -> Result<Option<Draw>> {
    let draw = conn
        .query_row(
            "SELECT date, label, digit_1, digit_2, digit_3
             FROM draws WHERE date = ?1 AND label = ?2",
            rusqlite::params![slot.date, slot.label],
            row_to_draw,
        )
        .optional()?;
    Ok(draw)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

/// Appends to the prediction log. Rows are never updated.
pub fn append_prediction(conn: &Connection, record: &PredictionRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO predictions (created_at, based_on_date, based_on_label, target_date, target_label,
                                  digit_1, digit_2, digit_3, frequency_weight, transition_weight, decay_rate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            record.created_at,
            record.based_on.date,
            record.based_on.label,
            record.target.date,
            record.target.label,
            record.digits[0],
            record.digits[1],
            record.digits[2],
            record.frequency_weight,
            record.transition_weight,
            record.decay_rate,
        ],
    ).context("Cannot append prediction")?;
    Ok(conn.last_insert_rowid())
}

/// The `limit` most recent log entries, newest first.
pub fn fetch_predictions(conn: &Connection, limit: u32) -> Result<Vec<PredictionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, based_on_date, based_on_label, target_date, target_label,
                digit_1, digit_2, digit_3, frequency_weight, transition_weight, decay_rate
         FROM predictions ORDER BY id DESC LIMIT ?1"
    )?;
    let records = stmt.query_map([limit], |row| {
        Ok(PredictionRecord {
            id: row.get(0)?,
            created_at: row.get(1)?,
            based_on: DrawSlot::new(row.get(2)?, row.get(3)?),
            target: DrawSlot::new(row.get(4)?, row.get(5)?),
            digits: [
                row.get::<_, u8>(6)?,
                row.get::<_, u8>(7)?,
                row.get::<_, u8>(8)?,
            ],
            frequency_weight: row.get(9)?,
            transition_weight: row.get(10)?,
            decay_rate: row.get(11)?,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
