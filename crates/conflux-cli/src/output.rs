//! Terminal rendering of plans and execution reports

use std::path::Path;

use conflux_core::domain::{ActionPlan, ExecutionReport, Outcome, PlanEntry};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// Path shown to the operator, relative to the scan root when possible
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Lines describing one plan entry
pub fn entry_lines(root: &Path, entry: &PlanEntry) -> Vec<String> {
    let count = entry.conflict_count();
    let mut header = format!(
        "{}  [{} conflict{}]  {}",
        display_path(root, entry.original_path()),
        count,
        if count == 1 { "" } else { "s" },
        entry.action()
    );
    if entry.is_duplicate() {
        header.push_str("  (duplicates)");
    }
    vec![header, format!("    {}", entry.rationale())]
}

/// Renders a plan in human form
pub fn print_plan(formatter: &dyn OutputFormatter, root: &Path, plan: &ActionPlan, quiet: bool) {
    let summary = plan.summary();
    if plan.is_empty() {
        formatter.success(&format!("No conflicts under {}", root.display()));
        return;
    }

    formatter.success(&format!(
        "{} group{} with {} conflict cop{} under {}",
        summary.groups,
        if summary.groups == 1 { "" } else { "s" },
        summary.conflicts,
        if summary.conflicts == 1 { "y" } else { "ies" },
        root.display()
    ));
    if !quiet {
        for entry in plan {
            for line in entry_lines(root, entry) {
                formatter.info(&line);
            }
        }
    }
    formatter.info(&format!(
        "keep original: {}, keep conflict: {}, keep both: {}, manual review: {}",
        summary.keep_original, summary.keep_conflict, summary.keep_both, summary.manual_review
    ));
}

/// Renders an execution report in human form
pub fn print_report(formatter: &dyn OutputFormatter, root: &Path, report: &ExecutionReport) {
    if !report.authorized {
        formatter.info(&format!(
            "Dry run: {} entr{} not applied; rerun with --commit to apply",
            report.skipped,
            if report.skipped == 1 { "y" } else { "ies" }
        ));
        return;
    }

    for result in &report.results {
        match result.outcome() {
            Outcome::Failed(reason) => formatter.error(&format!(
                "{}: {}",
                display_path(root, result.original_path()),
                reason
            )),
            Outcome::Cancelled => formatter.warn(&format!(
                "{}: cancelled",
                display_path(root, result.original_path())
            )),
            Outcome::Applied | Outcome::Skipped => {}
        }
    }

    let line = format!(
        "applied: {}, failed: {}, cancelled: {}",
        report.applied, report.failed, report.cancelled
    );
    if report.is_success() {
        formatter.success(&line);
    } else {
        formatter.warn(&line);
    }
}
