//! Tabular command output.
//!
//! Every command that prints something produces a [`Listing`]: a fixed tuple
//! of column names and zero or more rows. Listings render either as a table
//! or as a JSON array of objects keyed by column name.

use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON array of objects
    Json,
}

/// Column names plus rows of cell values
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Value>>,
}

impl Listing {
    /// A listing with the given columns and no rows
    pub fn new(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.push(row);
        self
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => self.to_json(),
        }
    }

    fn to_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.to_string()));
        for row in &self.rows {
            builder.push_record(row.iter().map(cell));
        }

        let mut table = builder.build();
        table.with(Style::psql());
        table.to_string()
    }

    fn to_json(&self) -> String {
        let records: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, value)| (column.to_string(), value.clone()))
                    .collect();
                Value::Object(record)
            })
            .collect();

        serde_json::to_string_pretty(&Value::Array(records)).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Strings print bare; everything else prints as compact JSON.
fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
