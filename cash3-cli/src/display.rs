use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};
use textplots::Plot;

use crate::import::ImportResult;
use cash3_db::models::{DIGITS, Draw, PredictionRecord, format_triplet};
use cash3_predict::evaluate::{AccuracyReport, MatchType};
use cash3_predict::insights::{PositionInsight, Summary, TripletCount};
use cash3_predict::models::frequency::FrequencyTable;
use cash3_predict::outcome::Outcome;
use cash3_predict::sampler::Suggestion;
use cash3_predict::scorer::Prediction;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn digit_header(first: &str) -> Vec<String> {
    std::iter::once(first.to_string())
        .chain((0..DIGITS).map(|d| d.to_string()))
        .collect()
}

fn match_color(match_type: MatchType) -> Color {
    match match_type {
        MatchType::Exact => Color::Green,
        MatchType::AnyOrder => Color::Yellow,
        MatchType::Miss => Color::White,
    }
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("No draws to show.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Date", "Draw", "Time", "Numbers"]);

    for draw in draws {
        table.add_row(vec![
            draw.date.to_string(),
            draw.label.to_string(),
            draw.label.draw_time().to_string(),
            draw.triplet(),
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import finished:");
    println!("  Rows read          : {}", result.total_records);
    println!("  Inserted           : {}", result.inserted);
    println!("  Duplicates skipped : {}", result.skipped);
    if result.errors > 0 {
        println!("  Errors             : {}", result.errors);
    }
}

pub fn display_frequencies(raw: &FrequencyTable, decayed: Option<&FrequencyTable>, window: usize) {
    println!("\n📊 Digit frequency over the last {} draws\n", window);

    let mut table = new_table();
    table.set_header(digit_header("Position"));
    for pos in 0..3 {
        let mut row = vec![Cell::new(format!("#{}", pos + 1))];
        let max = raw.max_weight(pos);
        for &w in raw.position(pos) {
            let cell = Cell::new(format!("{}", w as u64));
            row.push(if w > 0.0 && w == max { cell.fg(Color::Green) } else { cell });
        }
        table.add_row(row);
    }
    println!("{table}");

    if let Some(decayed) = decayed {
        println!("\n── Recency-weighted ──");
        let mut table = new_table();
        table.set_header(digit_header("Position"));
        for pos in 0..3 {
            let mut row = vec![format!("#{}", pos + 1)];
            row.extend(decayed.position(pos).iter().map(|w| format!("{:.2}", w)));
            table.add_row(row);
        }
        println!("{table}");
    }
}

pub fn display_prediction(prediction: &Prediction) {
    let target = prediction
        .target
        .map(|t| format!("{} ({})", t, t.label.draw_time()))
        .unwrap_or_else(|| "—".to_string());
    let decay = prediction
        .options
        .decay_rate
        .map(|r| format!("{}", r))
        .unwrap_or_else(|| "off".to_string());

    println!("\n🎯 Prediction for {}", target);
    println!(
        "   based on {} · w_freq={} w_trans={} decay={}\n",
        prediction.based_on,
        prediction.options.weights.frequency,
        prediction.options.weights.transition,
        decay,
    );

    let mut table = new_table();
    table.set_header(digit_header("Position"));
    for (pos, scores) in prediction.scores.iter().enumerate() {
        let mut row = vec![Cell::new(format!("#{}", pos + 1))];
        for (digit, &score) in scores.iter().enumerate() {
            let cell = Cell::new(format!("{:.3}", score));
            row.push(if digit as u8 == prediction.digits[pos] { cell.fg(Color::Green) } else { cell });
        }
        table.add_row(row);
    }
    println!("{table}");

    println!("\n   ➜ {}\n", prediction.triplet());
}

pub fn display_suggestions(suggestions: &[Suggestion], seed: u64) {
    println!("🎲 Weighted suggestions (seed {seed})\n");

    let mut table = new_table();
    table.set_header(vec!["#", "Numbers", "Lift"]);
    for (i, sug) in suggestions.iter().enumerate() {
        table.add_row(vec![
            format!("{}", i + 1),
            sug.triplet(),
            format!("{:.2}", sug.lift),
        ]);
    }
    println!("{table}");
}

pub fn display_accuracy(report: &AccuracyReport) {
    println!("\n== Walk-forward accuracy over {} draws ==\n", report.window);

    let mut table = new_table();
    table.set_header(vec!["Date", "Draw", "Predicted", "Actual", "Match", "Trained on"]);
    for entry in &report.log {
        table.add_row(vec![
            Cell::new(entry.slot.date.to_string()),
            Cell::new(entry.slot.label.to_string()),
            Cell::new(format_triplet(&entry.prediction)),
            Cell::new(format_triplet(&entry.actual)),
            Cell::new(entry.match_type.to_string()).fg(match_color(entry.match_type)),
            Cell::new(entry.training_size.to_string()),
        ]);
    }
    println!("{table}");

    println!("\n  Exact     : {}", report.exact_matches);
    println!("  Any order : {}", report.any_order_matches);
    println!("  Misses    : {}", report.misses);
    println!("  Hit rate  : {:.1}%", report.hit_rate() * 100.0);
}

pub fn display_accuracy_chart(report: &AccuracyReport) {
    let series = report.cumulative_hit_rate();
    if series.len() < 2 {
        return;
    }

    println!("\n== Cumulative hit rate ==\n");
    let points: Vec<(f32, f32)> = series
        .iter()
        .enumerate()
        .map(|(i, &rate)| ((i + 1) as f32, rate as f32))
        .collect();
    let y_max = series.iter().copied().fold(0.0f64, f64::max).max(0.05) as f32;
    let shape = textplots::Shape::Lines(&points);
    let mut chart = textplots::Chart::new_with_y_range(120, 40, 1.0, series.len() as f32, 0.0, y_max);
    println!("{}", chart.lineplot(&shape));
}

pub fn display_top_triplets(triplets: &[TripletCount]) {
    if triplets.is_empty() {
        println!("No draws to count.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["#", "Numbers", "Count", "Last seen"]);
    for (i, t) in triplets.iter().enumerate() {
        table.add_row(vec![
            format!("{}", i + 1),
            t.triplet.clone(),
            t.count.to_string(),
            t.last_seen.map(|d| d.to_string()).unwrap_or_else(|| "—".to_string()),
        ]);
    }
    println!("{table}");
}

pub fn display_insights(insights: &[PositionInsight], window: usize) {
    println!("\n🔎 Hot and cold digits over the last {} draws\n", window);

    let show = |d: Option<u8>| d.map(|d| d.to_string()).unwrap_or_else(|| "—".to_string());
    let mut table = new_table();
    table.set_header(vec!["Position", "Most common", "Least common"]);
    for (pos, insight) in insights.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("#{}", pos + 1)),
            Cell::new(show(insight.common)).fg(Color::Green),
            Cell::new(show(insight.uncommon)).fg(Color::Red),
        ]);
    }
    println!("{table}");
}

pub fn display_summary(summary: &Summary) {
    let latest = summary
        .latest_draw
        .map(|slot| slot.to_string())
        .unwrap_or_else(|| "—".to_string());
    println!("\n📋 Summary ({} draws, latest {})", summary.total_draws, latest);
    println!("   updated {}\n", summary.last_updated.format("%Y-%m-%d %H:%M"));

    let mut table = new_table();
    table.set_header(digit_header("Position"));
    for (pos, counts) in summary.digit_position_counts.iter().enumerate() {
        let mut row = vec![format!("#{}", pos + 1)];
        row.extend(counts.iter().map(|c| c.to_string()));
        table.add_row(row);
    }
    let mut overall = vec!["All".to_string()];
    overall.extend(summary.overall_digit_counts.iter().map(|c| c.to_string()));
    table.add_row(overall);
    println!("{table}");

    display_top_triplets(&summary.top_triplets);
}

pub fn display_prediction_log(entries: &[(PredictionRecord, Outcome)]) {
    if entries.is_empty() {
        println!("Prediction log is empty.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Made at", "For", "Predicted", "Actual", "Result"]);
    for (record, outcome) in entries {
        let (actual, result) = match outcome {
            Outcome::Pending => ("—".to_string(), Cell::new(outcome.to_string()).fg(Color::DarkGrey)),
            Outcome::Resolved { actual, match_type } => (
                format_triplet(actual),
                Cell::new(outcome.to_string()).fg(match_color(*match_type)),
            ),
        };
        table.add_row(vec![
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(record.target.to_string()),
            Cell::new(format_triplet(&record.digits)),
            Cell::new(actual),
            result,
        ]);
    }
    println!("{table}");
}
