use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use cash3_predict::insights::Summary;

/// Writes the snapshot next to its destination, then renames it over the old one,
/// so readers never observe a partial file.
pub fn write_summary(summary: &Summary, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create directory {:?}", dir))?;

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Cannot create temporary file in {:?}", dir))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("Cannot replace {:?}", path))?;
    Ok(())
}

/// A missing snapshot is not an error: it simply has not been generated yet.
pub fn read_summary(path: &Path) -> Result<Option<Summary>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Cannot read {:?}", path)),
    };
    let summary = serde_json::from_str(&json)
        .with_context(|| format!("Corrupt summary {:?}", path))?;
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cash3_db::models::{Draw, DrawLabel};
    use cash3_predict::History;
    use cash3_predict::insights::build_summary;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_summary(total: usize) -> Summary {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let draws = (0..total)
            .map(|i| Draw {
                date: start + chrono::Days::new(i as u64),
                label: DrawLabel::Evening,
                digits: [(i % 10) as u8, 1, 2],
            })
            .collect();
        let history = History::new(draws).unwrap();
        build_summary(&history, Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        let summary = sample_summary(12);

        write_summary(&summary, &path).unwrap();
        assert_eq!(read_summary(&path).unwrap(), Some(summary));
    }

    #[test]
    fn test_overwrite_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        write_summary(&sample_summary(30), &path).unwrap();
        write_summary(&sample_summary(2), &path).unwrap();

        let loaded = read_summary(&path).unwrap().unwrap();
        assert_eq!(loaded.total_draws, 2);
        // No temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_summary(&dir.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        std::fs::write(&path, "{ truncated").unwrap();
        assert!(read_summary(&path).is_err());
    }
}
