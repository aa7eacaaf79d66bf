mod config;
mod display;
mod import;
mod logging;
mod summary;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{Level, debug, info, warn};

use crate::config::Settings;
use crate::display::{
    display_accuracy, display_accuracy_chart, display_draws, display_frequencies,
    display_import_summary, display_insights, display_prediction, display_prediction_log,
    display_suggestions, display_summary, display_top_triplets,
};
use cash3_db::db::{
    append_prediction, count_draws, fetch_history, fetch_last_draws, fetch_predictions,
    insert_draw, migrate, open_db,
};
use cash3_db::models::{Draw, DrawLabel};
use cash3_db::rusqlite::Connection;
use cash3_predict::evaluate::{effective_window, evaluate_accuracy_with};
use cash3_predict::insights::{build_summary, position_insights, top_triplets};
use cash3_predict::models::frequency::compute_frequencies;
use cash3_predict::outcome::resolve_outcome;
use cash3_predict::sampler::{date_seed, generate_suggestions};
use cash3_predict::scorer::{ScoringOptions, predict};
use cash3_predict::{History, PredictError};

const EMPTY_DB: &str = "Empty database. Run first: cash3 import";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LabelArg {
    Midday,
    Evening,
    Night,
}

impl From<LabelArg> for DrawLabel {
    fn from(arg: LabelArg) -> Self {
        match arg {
            LabelArg::Midday => DrawLabel::Midday,
            LabelArg::Evening => DrawLabel::Evening,
            LabelArg::Night => DrawLabel::Night,
        }
    }
}

#[derive(Parser)]
#[command(name = "cash3", about = "Pick-3 digit draw analyzer and predictor")]
struct Cli {
    /// JSON settings file (defaults to data/cash3.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import draws from a CSV file
    Import {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the database path
    DbPath,

    /// List the most recent draws
    List {
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Per-position digit frequencies
    Stats {
        /// Number of recent draws to analyze
        #[arg(short, long, default_value = "100")]
        window: usize,
    },

    /// Predict the next draw
    Predict {
        /// Recency decay rate in (0, 1]
        #[arg(long, conflicts_with = "no_decay")]
        decay: Option<f64>,

        /// Count every draw equally
        #[arg(long)]
        no_decay: bool,

        /// Frequency weight
        #[arg(long)]
        w_freq: Option<f64>,

        /// Transition weight
        #[arg(long)]
        w_trans: Option<f64>,

        /// Number of weighted random suggestions (0 to disable)
        #[arg(short, long)]
        suggestions: Option<usize>,

        /// Sampler seed (defaults to today's date)
        #[arg(long)]
        seed: Option<u64>,

        /// Do not record the prediction in the log
        #[arg(long)]
        no_log: bool,
    },

    /// Walk-forward accuracy over recent draws
    Evaluate {
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Most frequent triplets
    Top {
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Restrict to one draw of the day
        #[arg(short, long)]
        draw: Option<LabelArg>,
    },

    /// Most and least common digit per position
    Insights {
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Write the JSON summary snapshot
    Summary {
        /// Destination (defaults to <data_dir>/<summary_file>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the existing snapshot instead of regenerating it
        #[arg(long)]
        show: bool,
    },

    /// Show logged predictions and their outcomes
    Log {
        #[arg(short, long, default_value = "20")]
        last: u32,
    },

    /// Add a draw manually
    Add,
}

fn main() -> Result<()> {
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        settings.level().unwrap_or(Level::WARN)
    };
    logging::init_logging(level);

    let path = settings.db_path();
    let command = match cli.command {
        Command::DbPath => {
            println!("{}", path.display());
            return Ok(());
        }
        command => command,
    };
    let conn = open_db(&path)?;
    migrate(&conn)?;
    debug!(db = %path.display(), "database ready");

    match command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => Ok(()),
        Command::List { last } => cmd_list(&conn, last),
        Command::Stats { window } => cmd_stats(&conn, &settings, window),
        Command::Predict {
            decay,
            no_decay,
            w_freq,
            w_trans,
            suggestions,
            seed,
            no_log,
        } => {
            let mut options = settings.scoring();
            if no_decay {
                options.decay_rate = None;
            } else if decay.is_some() {
                options.decay_rate = decay;
            }
            if let Some(w) = w_freq {
                options.weights.frequency = w;
            }
            if let Some(w) = w_trans {
                options.weights.transition = w;
            }
            let count = suggestions.unwrap_or(settings.suggestions);
            cmd_predict(&conn, &options, count, seed, no_log)
        }
        Command::Evaluate { window } => {
            cmd_evaluate(&conn, &settings, window.unwrap_or(settings.evaluate_window))
        }
        Command::Top { count, draw } => cmd_top(&conn, count, draw.map(DrawLabel::from)),
        Command::Insights { window } => {
            cmd_insights(&conn, window.unwrap_or(settings.insight_window))
        }
        Command::Summary { output, show } => {
            let output = output.unwrap_or_else(|| settings.summary_path());
            if show {
                cmd_show_summary(&output)
            } else {
                cmd_summary(&conn, &output)
            }
        }
        Command::Log { last } => cmd_log(&conn, last),
        Command::Add => cmd_add(&conn),
    }
}

fn load_history(conn: &Connection) -> Result<Option<History>> {
    if count_draws(conn)? == 0 {
        println!("{EMPTY_DB}");
        return Ok(None);
    }
    let history = History::new(fetch_history(conn)?)?;
    debug!(draws = history.len(), "history loaded");
    Ok(Some(history))
}

/// Turns "not enough history" into a message and lets other errors through.
fn report_insufficient<T>(result: cash3_predict::error::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PredictError::InsufficientData { required, available }) => {
            println!("Not enough history: {required} draw(s) needed, {available} available.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    info!(
        inserted = result.inserted,
        skipped = result.skipped,
        errors = result.errors,
        "import finished"
    );
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("{EMPTY_DB}");
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, settings: &Settings, window: usize) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    let recent = History::new(history.recent(window).to_vec())?;

    let raw = compute_frequencies(&recent, None);
    let decayed = settings
        .decay_rate
        .map(|rate| compute_frequencies(&recent, Some(rate)));
    display_frequencies(&raw, decayed.as_ref(), recent.len());
    Ok(())
}

fn cmd_predict(
    conn: &Connection,
    options: &ScoringOptions,
    count: usize,
    seed: Option<u64>,
    no_log: bool,
) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };

    let Some(prediction) = report_insufficient(predict(&history, options))? else {
        return Ok(());
    };
    display_prediction(&prediction);

    if count > 0 {
        let seed = seed.unwrap_or_else(date_seed);
        let suggestions = generate_suggestions(&history, options, count, seed)?;
        display_suggestions(&suggestions, seed);
    }

    if no_log {
        return Ok(());
    }
    match prediction.to_record() {
        Some(record) => {
            let id = append_prediction(conn, &record)?;
            info!(id, next = %record.target, triplet = %prediction.triplet(), "prediction logged");
        }
        None => debug!("no next draw slot, prediction not logged"),
    }
    Ok(())
}

fn cmd_evaluate(conn: &Connection, settings: &Settings, window: usize) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    let options = settings.scoring();

    let pb = ProgressBar::new(effective_window(&history, window) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let result = evaluate_accuracy_with(&history, window, &options, |step| {
        pb.set_message(step.slot.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();

    let Some(report) = report_insufficient(result)? else {
        return Ok(());
    };
    info!(window = report.window, hits = report.hits(), "evaluation finished");
    display_accuracy(&report);
    display_accuracy_chart(&report);
    Ok(())
}

fn cmd_top(conn: &Connection, count: usize, label: Option<DrawLabel>) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    display_top_triplets(&top_triplets(&history, label, count));
    Ok(())
}

fn cmd_insights(conn: &Connection, window: usize) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    let insights = position_insights(&history, window);
    display_insights(&insights, window.min(history.len()));
    Ok(())
}

fn cmd_summary(conn: &Connection, output: &Path) -> Result<()> {
    let previous = summary::read_summary(output).unwrap_or_else(|e| {
        warn!(error = %e, "previous summary unreadable, replacing it");
        None
    });
    let history = History::new(fetch_history(conn)?)?;
    let summary = build_summary(&history, Utc::now());
    summary::write_summary(&summary, output)?;
    if let Some(previous) = previous {
        println!(
            "Previous snapshot: {} draws, updated {}.",
            previous.total_draws,
            previous.last_updated.format("%Y-%m-%d %H:%M")
        );
    }
    info!(path = %output.display(), draws = summary.total_draws, "summary written");
    println!("Summary written to {} ({} draws).", output.display(), summary.total_draws);
    Ok(())
}

fn cmd_show_summary(path: &Path) -> Result<()> {
    match summary::read_summary(path)? {
        Some(snapshot) => display_summary(&snapshot),
        None => println!("No summary at {} yet. Run: cash3 summary", path.display()),
    }
    Ok(())
}

fn cmd_log(conn: &Connection, last: u32) -> Result<()> {
    let records = fetch_predictions(conn, last)?;
    let history = History::new(fetch_history(conn)?)?;
    let entries: Vec<_> = records
        .into_iter()
        .map(|record| {
            let outcome = resolve_outcome(&record, &history);
            (record, outcome)
        })
        .collect();
    display_prediction_log(&entries);
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Add a draw manually\n");

    let date = loop {
        let raw = prompt("Date (YYYY-MM-DD or MM/DD/YYYY): ")?;
        match import::parse_date(&raw) {
            Ok(date) => break date,
            Err(e) => println!("{e}. Try again."),
        }
    };
    let label = loop {
        let raw = prompt("Draw (midday/evening/night): ")?;
        match import::parse_label(&raw) {
            Ok(label) => break label,
            Err(e) => println!("{e}. Try again."),
        }
    };
    let digits = loop {
        let raw = prompt("Digits (e.g. 3 0 7): ")?;
        match import::parse_combined(&raw) {
            Ok(digits) => break digits,
            Err(e) => println!("{e}. Try again."),
        }
    };

    let draw = Draw::new(date, label, digits)?;

    println!("\nDraw to insert:");
    display_draws(&[draw]);

    let confirm = prompt("\nConfirm? (y/n): ")?;
    if confirm.trim().eq_ignore_ascii_case("y") {
        if insert_draw(conn, &draw)? {
            info!(slot = %draw.slot(), "draw added");
            println!("Draw inserted.");
        } else {
            println!("This draw already exists (duplicate ignored).");
        }
    } else {
        println!("Cancelled.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict_flags() {
        let cli = Cli::try_parse_from([
            "cash3", "predict", "--decay", "0.9", "--w-freq", "1", "--seed", "7", "--no-log",
        ])
        .unwrap();
        match cli.command {
            Command::Predict { decay, w_freq, seed, no_log, .. } => {
                assert_eq!(decay, Some(0.9));
                assert_eq!(w_freq, Some(1.0));
                assert_eq!(seed, Some(7));
                assert!(no_log);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_decay_conflicts_with_no_decay() {
        assert!(Cli::try_parse_from(["cash3", "predict", "--decay", "0.9", "--no-decay"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cash3", "summary", "--show", "--config", "x.json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.json")));
        assert!(matches!(cli.command, Command::Summary { show: true, output: None }));
    }

    #[test]
    fn test_top_draw_filter() {
        let cli = Cli::try_parse_from(["cash3", "top", "--draw", "night"]).unwrap();
        match cli.command {
            Command::Top { count, draw } => {
                assert_eq!(count, 10);
                assert_eq!(draw.map(DrawLabel::from), Some(DrawLabel::Night));
            }
            _ => panic!("expected top"),
        }
    }

    #[test]
    fn test_db_path_does_not_create_database() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let config = dir.path().join("cash3.json");
        let json = serde_json::json!({ "data_dir": data_dir });
        std::fs::write(&config, json.to_string()).unwrap();

        let cli = Cli::try_parse_from(["cash3", "db-path", "--config", config.to_str().unwrap()]).unwrap();
        run(cli).unwrap();
        assert!(!data_dir.exists());

        let cli = Cli::try_parse_from(["cash3", "list", "--config", config.to_str().unwrap()]).unwrap();
        run(cli).unwrap();
        assert!(data_dir.join("cash3.db").exists());
    }

    #[test]
    fn test_insufficient_data_is_reported_not_raised() {
        let short: cash3_predict::error::Result<()> =
            Err(PredictError::InsufficientData { required: 2, available: 1 });
        assert!(report_insufficient(short).unwrap().is_none());

        let invalid: cash3_predict::error::Result<()> = Err(PredictError::InvalidDecayRate(2.0));
        assert!(report_insufficient(invalid).is_err());
        assert_eq!(report_insufficient(Ok(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_summary_command_reads_then_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("summary.json");
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        insert_draw(&conn, &Draw::new(day, DrawLabel::Midday, [1, 2, 3]).unwrap()).unwrap();

        cmd_show_summary(&output).unwrap();
        cmd_summary(&conn, &output).unwrap();
        insert_draw(&conn, &Draw::new(day, DrawLabel::Night, [4, 5, 6]).unwrap()).unwrap();
        cmd_summary(&conn, &output).unwrap();
        cmd_show_summary(&output).unwrap();

        let snapshot = summary::read_summary(&output).unwrap().unwrap();
        assert_eq!(snapshot.total_draws, 2);
    }
}
