//! The `studyspark compare` command.

use std::path::PathBuf;

use anyhow::Result;

use studyspark_core::report::AnalyticsSnapshot;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(
        threshold.is_finite() && threshold >= 0.0,
        "threshold must be a non-negative number"
    );

    let baseline = AnalyticsSnapshot::load_json(&baseline_path)?;
    let current = AnalyticsSnapshot::load_json(&current_path)?;

    let comparison = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", comparison.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        _ => {
            println!(
                "Comparison: {} regressions, {} improvements, {} unchanged (overall {:+.1} points)",
                comparison.regressions.len(),
                comparison.improvements.len(),
                comparison.unchanged,
                comparison.overall_delta
            );

            if !comparison.regressions.is_empty() {
                println!("\nRegressions:");
                for r in &comparison.regressions {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1})",
                        r.topic, r.baseline_mastery, r.current_mastery, r.delta
                    );
                }
            }

            if !comparison.improvements.is_empty() {
                println!("\nImprovements:");
                for i in &comparison.improvements {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1})",
                        i.topic, i.baseline_mastery, i.current_mastery, i.delta
                    );
                }
            }

            if comparison.new_topics > 0 {
                println!("\n{} new topic(s)", comparison.new_topics);
            }
            if comparison.removed_topics > 0 {
                println!("{} removed topic(s)", comparison.removed_topics);
            }
        }
    }

    if fail_on_regression && comparison.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
