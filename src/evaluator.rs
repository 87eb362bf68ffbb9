//! Formula recalculation using formualizer-workbook.
//!
//! Chase workbooks exported by other tools sometimes carry formulas
//! without cached results; the status column is then blank for every row.
//! Recalculating gives the status lookups their real values.

use crate::error::{Error, Result};
use formualizer_workbook::{
    backends::UmyaAdapter,
    traits::{LoadStrategy, SpreadsheetReader},
    LiteralValue, Workbook, WorkbookConfig,
};
use std::path::Path;

/// Workbook with every formula recomputed.
pub struct EvaluatedWorkbook {
    workbook: Workbook,
}

impl EvaluatedWorkbook {
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |stage: &str, details: String| Error::InvalidExcel {
            path: path.to_path_buf(),
            details: format!("{}: {}", stage, details),
        };

        let adapter = UmyaAdapter::open_path(path).map_err(|e| invalid("formualizer", e.to_string()))?;
        let sheet_count = adapter
            .sheet_names()
            .map_err(|e| invalid("formualizer", e.to_string()))?
            .len();

        let mut workbook = Workbook::from_reader(adapter, LoadStrategy::EagerAll, WorkbookConfig::ephemeral())
            .map_err(|e| invalid("formualizer", e.to_string()))?;

        workbook
            .evaluate_all()
            .map_err(|e| invalid("evaluation failed", e.to_string()))?;

        tracing::debug!(path = %path.display(), sheets = sheet_count, "recalculated workbook");
        Ok(Self { workbook })
    }

    /// Evaluated value of a cell as text, in the same shapes the plain
    /// reader produces (ISO dates, integral numbers without decimals).
    pub fn get_value(&self, sheet: &str, row: u32, col: u32) -> Option<String> {
        let value = self.workbook.get_value(sheet, row, col)?;
        Some(format_literal(&value))
    }
}

fn format_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Empty => String::new(),
        LiteralValue::Int(i) => i.to_string(),
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::Text(s) => s.clone(),
        LiteralValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        LiteralValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        LiteralValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        LiteralValue::Time(t) => t.format("%H:%M:%S").to_string(),
        LiteralValue::Duration(dur) => format!("{}s", dur.num_seconds()),
        LiteralValue::Error(e) => format!("{}", e),
        LiteralValue::Array(arr) => arr
            .first()
            .and_then(|row| row.first())
            .map(format_literal)
            .unwrap_or_default(),
        LiteralValue::Pending => String::new(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}
