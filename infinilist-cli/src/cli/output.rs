// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! List view formatting for CLI output

use super::commands::OutputFormat;
use super::fixture::FixtureItem;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use infinilist::ListView;
use serde_json::Value;
use std::collections::BTreeSet;

/// View formatter for the supported output formats
pub struct ViewFormatter;

impl ViewFormatter {
    pub fn format(view: &ListView<FixtureItem>, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(view),
            OutputFormat::Json => Self::format_json(view),
        }
    }

    fn format_table(view: &ListView<FixtureItem>) -> String {
        let mut output = String::new();

        if view.rows.is_empty() {
            output.push_str(&format!("{}\n", "No rows".yellow()));
        } else {
            // Union of field names across rows, in stable order
            let columns: BTreeSet<&str> = view
                .rows
                .iter()
                .flat_map(|row| row.fields.keys().map(String::as_str))
                .collect();

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);

            let mut header = vec![Cell::new("id").fg(Color::Green)];
            header.extend(columns.iter().map(|col| Cell::new(col).fg(Color::Green)));
            header.push(Cell::new("favorite").fg(Color::Green));
            table.set_header(header);

            for row in &view.rows {
                let mut cells = vec![row.id.to_string()];
                cells.extend(columns.iter().map(|col| {
                    row.fields
                        .get(*col)
                        .map(Self::value_to_string)
                        .unwrap_or_default()
                }));
                cells.push(if row.favorite { "★".to_string() } else { String::new() });
                table.add_row(cells);
            }

            output.push_str(&table.to_string());
            output.push('\n');
        }

        let total = view
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let has_more = if view.has_more {
            "yes".green()
        } else {
            "no".normal()
        };
        output.push_str(&format!(
            "Rows: {}  Total: {}  More: {}\n",
            view.rows.len(),
            total,
            has_more
        ));

        if let Some(error) = &view.error {
            output.push_str(&format!("{} {}\n", "Error:".bold().red(), error));
        }

        output
    }

    fn format_json(view: &ListView<FixtureItem>) -> String {
        let json_result = serde_json::json!({
            "rows": view.rows,
            "total": view.total,
            "has_more": view.has_more,
            "is_loading_initial": view.is_loading_initial,
            "is_loading_more": view.is_loading_more,
            "error": view.error.as_ref().map(|e| e.to_string()),
        });

        serde_json::to_string_pretty(&json_result).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize view to JSON\"}".to_string()
        })
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::fixture;

    fn view(rows: Vec<FixtureItem>, total: Option<u64>, has_more: bool) -> ListView<FixtureItem> {
        ListView {
            rows,
            total,
            is_loading_initial: false,
            is_loading_more: false,
            has_more,
            error: None,
        }
    }

    #[test]
    fn test_table_lists_every_field() {
        colored::control::set_override(false);
        let rows = fixture::parse(
            r#"[{"id": 1, "name": "Tea House"}, {"id": 2, "type": "booth", "favorite": true}]"#,
        )
        .unwrap();
        let output = ViewFormatter::format(&view(rows, Some(5), true), OutputFormat::Table);

        assert!(output.contains("Tea House"));
        assert!(output.contains("booth"));
        assert!(output.contains("★"));
        assert!(output.contains("Rows: 2  Total: 5  More: yes"));
    }

    #[test]
    fn test_json_output() {
        let rows = fixture::parse(r#"[{"id": 3, "name": "Ink"}]"#).unwrap();
        let output = ViewFormatter::format(&view(rows, None, false), OutputFormat::Json);

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["rows"][0]["id"], 3);
        assert_eq!(parsed["rows"][0]["name"], "Ink");
        assert_eq!(parsed["total"], Value::Null);
        assert_eq!(parsed["has_more"], false);
    }
}
