//! Tidy tabular output: one record per row, one field per column.

use std::io::Write;

use anyhow::Result;
use obesity_model::Value;
use obesity_rates::views::{RankedRate, ScatterPoint, SeriesPoint};
use obesity_rates::RateTable;
use serde_json::{Map, Value as JsonValue};

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

fn cell(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Number(n) => match value.as_i64() {
            Some(i) => JsonValue::from(i),
            None => number(Some(n.0)),
        },
        Value::Text(s) => JsonValue::String(s.to_string()),
    }
}

fn number(value: Option<f64>) -> JsonValue {
    value
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

impl From<&RateTable> for Report {
    fn from(table: &RateTable) -> Self {
        let columns = table
            .group_columns
            .iter()
            .chain(table.value_columns.iter())
            .cloned()
            .collect();
        let rows = table
            .rows
            .iter()
            .map(|row| {
                row.key
                    .iter()
                    .map(cell)
                    .chain(row.rates().into_iter().map(number))
                    .collect()
            })
            .collect();
        Report { columns, rows }
    }
}

impl Report {
    pub fn ranked(rates: &[RankedRate], value_column: &str) -> Self {
        Report {
            columns: vec!["rank".into(), "country".into(), value_column.to_string()],
            rows: rates
                .iter()
                .enumerate()
                .map(|(i, r)| vec![JsonValue::from(i + 1), cell(&r.country), number(Some(r.rate))])
                .collect(),
        }
    }

    pub fn series(points: &[SeriesPoint], group_column: &str, value_column: &str) -> Self {
        Report {
            columns: vec![
                "year".into(),
                group_column.to_string(),
                value_column.to_string(),
                "highlighted".into(),
            ],
            rows: points
                .iter()
                .map(|p| {
                    vec![
                        JsonValue::from(p.year),
                        cell(&p.group),
                        number(p.rate),
                        JsonValue::Bool(p.highlighted),
                    ]
                })
                .collect(),
        }
    }

    pub fn scatter(points: &[ScatterPoint], group_column: &str, x: &str, y: &str) -> Self {
        let mut columns = vec!["country".to_string()];
        if group_column != "country" {
            columns.push(group_column.to_string());
        }
        columns.push(x.to_string());
        columns.push(y.to_string());

        let rows = points
            .iter()
            .map(|p| {
                let mut row = vec![cell(&p.country)];
                if group_column != "country" {
                    row.push(cell(&p.group));
                }
                row.push(number(Some(p.x)));
                row.push(number(Some(p.y)));
                row
            })
            .collect();
        Report { columns, rows }
    }

    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        let records: Vec<Map<String, JsonValue>> = self
            .rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect();
        let mut buf = serde_json::to_vec(&records)?;
        buf.push(b'\n');
        out.write_all(&buf)?;
        Ok(())
    }

    pub fn write_csv(&self, out: &mut dyn Write) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(plain))?;
        }
        let buf = writer.into_inner().map_err(|e| anyhow::anyhow!("flush csv output: {e}"))?;
        out.write_all(&buf)?;
        Ok(())
    }

    pub fn write_text(&self, out: &mut dyn Write) -> Result<()> {
        if self.rows.is_empty() {
            writeln!(out, "No data for this selection.")?;
            return Ok(());
        }

        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(pretty).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rendered
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        writeln!(out, "{}", header.join("  ").trim_end())?;
        for row in &rendered {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        Ok(())
    }
}

fn plain(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "-".to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        other => plain(other),
    }
}
