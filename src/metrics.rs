use crate::sitemap::WalkOutcome;
use crate::utils;
use once_cell::sync::Lazy;
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator, TableFormat};
use prettytable::{Cell, Row, Table};
use std::path::Path;
use std::time::Duration;

/// Box-drawn, two column layout used for the walk summary.
///
/// ```text
/// ┌──────────────┬─────────┐
/// │ Pages        │ 42      │
/// │ Errors       │ 1       │
/// └──────────────┴─────────┘
/// ```
static TABLE_FORMAT: Lazy<TableFormat> = Lazy::new(|| {
    FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(&[LinePosition::Top], LineSeparator::new('─', '┬', '┌', '┐'))
        .separators(
            &[LinePosition::Bottom],
            LineSeparator::new('─', '┴', '└', '┘'),
        )
        .padding(1, 1)
        .build()
});

#[derive(Debug)]
pub struct Entry {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug)]
pub struct Metrics(pub Vec<Entry>);

impl Metrics {
    pub fn build_table(&self) -> String {
        let mut table = Table::new();
        table.set_format(*TABLE_FORMAT);
        for entry in &self.0 {
            table.add_row(Row::new(vec![
                Cell::new(entry.label),
                Cell::new(&entry.value),
            ]));
        }
        table.to_string()
    }
}

/// Key figures of a finished walk.
pub fn walk_summary(
    outcome: &WalkOutcome,
    requests: usize,
    cache_dir: Option<&Path>,
    elapsed: Duration,
) -> Metrics {
    Metrics(vec![
        Entry {
            label: "Sitemaps",
            value: outcome.sitemaps.to_string(),
        },
        Entry {
            label: "Pages",
            value: outcome.entries.len().to_string(),
        },
        Entry {
            label: "Errors",
            value: outcome.errors.len().to_string(),
        },
        Entry {
            label: "Network Requests",
            value: requests.to_string(),
        },
        Entry {
            label: "Cache",
            value: match cache_dir {
                Some(dir) => dir.display().to_string(),
                None => "No".to_string(),
            },
        },
        Entry {
            label: "Elapsed Time",
            value: utils::ms(elapsed),
        },
    ])
}
