//! Terminal output for the non-report commands.
//!
//! The report itself is plain Markdown; everything here is for humans at a
//! terminal (topic listings, state inspection, run summaries).

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::models::TopicGroups;
use crate::pipeline::RunSummary;
use crate::state::ProcessedIdSet;

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line to stderr, leaving stdout for data.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Table of topic groups and what they expand to
pub fn topic_groups_table(groups: &TopicGroups) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Group", "Expands to"]);

    for (name, topics) in groups {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(topics.join(", ")),
        ]);
    }
    table
}

/// Table of processed identifiers, several per row
pub fn processed_ids_table(ids: &ProcessedIdSet, per_row: usize) -> Table {
    let per_row = per_row.max(1);
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);

    let ids: Vec<&String> = ids.iter().collect();
    for chunk in ids.chunks(per_row) {
        table.add_row(chunk.iter().map(|id| Cell::new(id)).collect::<Vec<_>>());
    }
    table
}

/// One-paragraph recap of a run, printed after the report is written
pub fn print_run_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    let included = stats.included.to_string();
    print_status(
        Status::Success,
        &format!(
            "{} of {} papers included ({} skipped, {} examined, {} dropped)",
            included.green().bold(),
            stats.entries,
            stats.skipped,
            stats.examined,
            stats.dropped
        ),
    );
    print_status(Status::Info, &format!("Date range: {}", summary.date_range));
    if let Some(path) = &summary.report {
        print_status(Status::Info, &format!("Report: {}", path.display()));
    }
    if !summary.state_saved {
        print_status(Status::Warning, "Processed papers were not recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_topic_groups;

    #[test]
    fn test_topic_groups_table_lists_every_group() {
        let groups = default_topic_groups();
        let rendered = topic_groups_table(&groups).to_string();
        assert!(rendered.contains("HCI"));
        assert!(rendered.contains("machine learning"));
        assert!(rendered.contains("Expands to"));
    }

    #[test]
    fn test_processed_ids_table() {
        let ids: ProcessedIdSet = ["A1", "A2", "A3"].iter().map(|s| s.to_string()).collect();
        let table = processed_ids_table(&ids, 2);
        assert_eq!(table.row_iter().count(), 2);
    }
}
