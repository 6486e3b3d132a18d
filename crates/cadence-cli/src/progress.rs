//! Console output for `cadence evaluate`.

use std::io::Write;

use cadence_core::{EvaluationReport, ScenarioRecord, ScoreRecord};
use cadence_runtime::{ProgressReporter, UsageReport};

const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// One line per scenario on stdout.
pub struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn scenario_started(&self, position: usize, total: usize, id: &str, scenario: &ScenarioRecord) {
        print!(
            "▶ [{}/{}] ID {} ({}) ... ",
            position,
            total,
            id,
            scenario.location.as_deref().unwrap_or("")
        );
        std::io::stdout().flush().ok();
    }

    fn scenario_finished(&self, record: &ScoreRecord) {
        if record.is_hallucination() {
            println!("{RED}Hallucination: {}{RESET}", record.hallucination_track());
        } else {
            println!("Acc:{:.0}", record.total_accuracy);
        }
    }
}

pub fn print_report(report: &EvaluationReport) {
    let summary = &report.summary;
    println!();
    println!("{}", "=".repeat(40));
    println!("FINAL 5-KPI REPORT");
    println!("{}", "=".repeat(40));
    println!("1. Accuracy            : {:.1}", summary.accuracy_total);
    println!("   - Logic avg         : {:.1}", summary.accuracy_logic);
    println!("   - Math avg          : {:.1}", summary.accuracy_math);
    println!("2. Stability           : {:.1}%", summary.stability);
    println!("3. Search success      : {:.1}% (total ratio)", summary.search_success_rate);
    println!("4. Consistency         : {:.2}", summary.consistency);
    println!("5. Diversity           : {:.1}%", summary.diversity);
    println!("{}", "=".repeat(40));
}

pub fn print_usage(usage: &UsageReport) {
    if usage.total.llm_calls == 0 {
        return;
    }
    println!();
    println!("LLM usage:");
    for (stage, stage_usage) in &usage.by_stage {
        println!(
            "  {:<10} {:>4} calls {:>9} tokens  ${:.4}",
            stage.to_string(),
            stage_usage.llm_calls,
            stage_usage.total_tokens,
            stage_usage.estimated_cost
        );
    }
    println!(
        "  {:<10} {:>4} calls {:>9} tokens  ${:.4}",
        "total", usage.total.llm_calls, usage.total.total_tokens, usage.total.estimated_cost
    );
}
