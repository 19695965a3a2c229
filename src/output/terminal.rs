// Colored terminal output for flagged hosts, manual checks, and models.
//
// The main.rs display paths delegate here. Colour can be turned off
// globally with `set_color`.

use colored::{Color, Colorize};

use super::ScoreEvent;
use crate::classifier::metrics::ModelMetrics;
use crate::db::models::ModelSummary;
use crate::scoring::Tier;

/// Probability at or above which a manual check reports PHISHING.
pub const CHECK_THRESHOLD: f64 = 0.5;

pub fn set_color(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Paint `text` in the tier's configured colour. Unknown names stay plain.
fn paint(text: &str, color: &str) -> colored::ColoredString {
    match color.parse::<Color>() {
        Ok(c) => text.color(c),
        Err(_) => text.normal(),
    }
}

/// One line per flagged host: `[context] [LABEL] [SCORE:0.953] host`.
pub fn format_event(event: &ScoreEvent, tier: &Tier) -> String {
    let mut line = String::new();
    if let Some(ctx) = &event.context {
        let parts: Vec<&str> = [
            ctx.seen_timestamp.as_deref(),
            ctx.log_source.as_deref(),
            ctx.issuer_ca.as_deref(),
            ctx.root_ca.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !parts.is_empty() {
            line.push_str(&format!("[{}] ", parts.join(" | ")).dimmed().to_string());
        }
    }

    let label = format!("[{}]", tier.label);
    line.push_str(&format!(
        "{} [SCORE:{:.3}] {}",
        paint(&label, &tier.color).bold(),
        event.score,
        paint(&event.host, &tier.color)
    ));
    line
}

pub fn display_event(event: &ScoreEvent, tier: &Tier) {
    println!("{}", format_event(event, tier));
}

/// Result of `phishstream check`.
pub fn display_check(host: &str, score: f64) {
    let verdict = if score >= CHECK_THRESHOLD {
        "PHISHING".red().bold()
    } else {
        "NOT PHISHING".green().bold()
    };
    println!("  {:<50} {:>6.3}  {}", host, score, verdict);
}

/// Display stored models; the active one is marked with `*`.
pub fn display_models(models: &[ModelSummary]) {
    if models.is_empty() {
        println!("No models trained yet. Run `phishstream train --name <name>` first.");
        return;
    }

    println!("\n{}", format!("=== Models ({}) ===", models.len()).bold());
    println!();
    println!(
        "  {:<2}{:<28} {:<20} {:>8}  {}",
        "",
        "Name".dimmed(),
        "Algorithm".dimmed(),
        "Test acc".dimmed(),
        "Created".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for model in models {
        let marker = if model.active { "*".green().bold() } else { " ".normal() };
        println!(
            "  {} {:<28} {:<20} {:>8.3}  {}",
            marker, model.name, model.algorithm, model.test_set_accuracy, model.created_at
        );
    }
    println!();
}

/// Display the training report of a model.
pub fn display_metrics(name: &str, metrics: &ModelMetrics) {
    let info = &metrics.info;
    let acc = &metrics.accuracy;

    println!("\n{}", format!("=== Metrics for '{name}' ===").bold());
    println!("  Algorithm:        {}", info.algorithm);
    println!("  Parameters:       {}", info.parameters);
    println!("  Trained:          {}", info.training_date);
    println!(
        "  Samples:          {} benign, {} phishing",
        info.benign_samples, info.phishing_samples
    );
    println!("  Vector size:      {}", info.feature_vector_size);
    println!();
    println!("  Training acc:     {:.4}", acc.training_set_accuracy);
    println!("  Test acc:         {:.4}", acc.test_set_accuracy);
    println!("  TPR / FPR:        {:.4} / {:.4}", acc.true_positive_rate, acc.false_positive_rate);
    println!("  Precision:        {:.4}", acc.precision);
    println!("  Recall:           {:.4}", acc.recall);
    println!("  ROC AUC:          {:.4}", acc.auc_score);

    let m = &acc.confusion_matrix;
    println!("\n  Confusion matrix (rows: actual, cols: predicted)");
    println!("  {:>12} {:>8} {:>8}", "", "benign".dimmed(), "phishing".dimmed());
    println!("  {:>12} {:>8} {:>8}", "benign".dimmed(), m.true_negatives, m.false_positives);
    println!("  {:>12} {:>8} {:>8}", "phishing".dimmed(), m.false_negatives, m.true_positives);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::EventContext;

    #[test]
    fn test_format_event_plain() {
        set_color(false);
        let event = ScoreEvent {
            host: "paypal-login.tk".into(),
            score: 0.9536,
            tier: "high".into(),
            context: Some(EventContext {
                issuer_ca: Some("Let's Encrypt".into()),
                ..Default::default()
            }),
        };
        let line = format_event(&event, &Tier::new("high", 0.9, "red"));
        assert_eq!(line, "[Let's Encrypt] [HIGH] [SCORE:0.954] paypal-login.tk");
    }
}
