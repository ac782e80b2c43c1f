//! Output formatting for CLI commands

use crate::domain::IsolationSegment;
use crate::messages::PaginationOptions;
use crate::storage::MigrationInfo;
use anyhow::{Context, Result};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'table'.", s),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationSummary {
    pub total_results: i64,
    pub total_pages: i64,
    pub page: u32,
    pub per_page: u32,
}

/// One page of a listing plus its totals
#[derive(Debug, Clone, Serialize)]
pub struct ListOutput {
    pub pagination: PaginationSummary,
    pub resources: Vec<IsolationSegment>,
}

impl ListOutput {
    pub fn new(options: &PaginationOptions, total: i64, resources: Vec<IsolationSegment>) -> Self {
        Self {
            pagination: PaginationSummary {
                total_results: total,
                total_pages: options.total_pages(total),
                page: options.page,
                per_page: options.per_page,
            },
            resources,
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn print_segments_table(listing: &ListOutput) {
    println!();
    println!("{:<38} {:<30} {:<25}", "GUID", "Name", "Created");
    println!("{}", "-".repeat(93));

    for segment in &listing.resources {
        println!(
            "{:<38} {:<30} {:<25}",
            segment.guid.as_str(),
            truncate(&segment.name, 28),
            segment.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let p = &listing.pagination;
    println!();
    println!("Page {} of {} ({} total)", p.page, p.total_pages.max(1), p.total_results);
}

/// Print migrations in a formatted table
pub fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!();
    println!("{:<15} {:<50} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(100));

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<25} {:<10}",
            migration.version,
            truncate(&migration.description, 48),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-segment-name", 10), "a-very-...");
    }

    #[test]
    fn test_list_output_totals() {
        let options = PaginationOptions { page: 2, per_page: 10, ..Default::default() };
        let listing = ListOutput::new(&options, 25, Vec::new());
        assert_eq!(listing.pagination.total_pages, 3);
        assert_eq!(listing.pagination.page, 2);
    }
}
