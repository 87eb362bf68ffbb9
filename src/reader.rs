use crate::error::{Error, Result};
use crate::evaluator::EvaluatedWorkbook;
use crate::table::Table;
use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use ssfmt::{FormatOptions, NumberFormat};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use umya_spreadsheet::structs::Worksheet;
use umya_spreadsheet::Spreadsheet;

const WORKBOOK_EXTENSIONS: [&str; 3] = ["xlsx", "xlsm", "xls"];

/// Newest workbook (by modification time) in `folder` whose name starts
/// with `prefix`, case-insensitively.
pub fn find_chase_file(folder: &Path, prefix: &str) -> Result<PathBuf> {
    if !folder.is_dir() {
        return Err(Error::FileNotFound(folder.to_path_buf()));
    }

    let wanted = prefix.to_lowercase();
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.starts_with(&wanted) || !has_workbook_extension(&name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    let (_, path) = newest.ok_or_else(|| Error::NoChaseFile {
        folder: folder.to_path_buf(),
        prefix: prefix.to_string(),
    })?;
    tracing::info!(file = %path.display(), "selected newest chase workbook");
    Ok(path)
}

fn has_workbook_extension(name: &str) -> bool {
    WORKBOOK_EXTENSIONS.contains(&extension_of(Path::new(name)).as_str())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Open a chase or directory workbook: umya for xlsx/xlsm, xlrd for legacy xls.
pub fn open_workbook(path: &Path) -> Result<Spreadsheet> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let invalid = |details: String| Error::InvalidExcel {
        path: path.to_path_buf(),
        details,
    };
    let workbook = match extension_of(path).as_str() {
        "xlsx" | "xlsm" => umya_spreadsheet::reader::xlsx::read(path).map_err(|e| invalid(e.to_string()))?,
        "xls" => xlrd::open(path).map_err(|e| invalid(e.to_string()))?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    tracing::debug!(
        path = %path.display(),
        sheets = workbook.get_sheet_collection().len(),
        "opened workbook"
    );
    Ok(workbook)
}

pub fn sheet_names(workbook: &Spreadsheet) -> Vec<String> {
    workbook
        .get_sheet_collection()
        .iter()
        .map(|s| s.get_name().to_string())
        .collect()
}

/// Week number of a `WK <n>` sheet name.
pub fn week_number(sheet_name: &str) -> Option<u32> {
    static WEEK_SHEET: OnceLock<Regex> = OnceLock::new();
    let re = WEEK_SHEET.get_or_init(|| Regex::new(r"(?i)^\s*wk\s*(\d+)").expect("valid regex"));
    re.captures(sheet_name)?.get(1)?.as_str().parse().ok()
}

/// The WK sheet with the highest week number. Ties keep the first sheet.
pub fn latest_week_sheet(sheet_names: &[String]) -> Option<&str> {
    let mut best: Option<(u32, &str)> = None;
    for name in sheet_names {
        if let Some(n) = week_number(name) {
            if best.map_or(true, |(b, _)| n > b) {
                best = Some((n, name));
            }
        }
    }
    best.map(|(_, name)| name)
}

pub fn get_sheet<'a>(workbook: &'a Spreadsheet, name: &str) -> Result<&'a Worksheet> {
    workbook
        .get_sheet_by_name(name)
        .ok_or_else(|| Error::SheetNotFound {
            name: name.to_string(),
            available: sheet_names(workbook).join(", "),
        })
}

/// Read every cell of `sheet` as text. Formula cells take their value from
/// `evaluated` when the workbook was recalculated.
pub fn read_table(sheet: &Worksheet, evaluated: Option<&EvaluatedWorkbook>) -> Table {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let opts = FormatOptions::default();

    let rows = (1..=max_row)
        .map(|row| {
            (1..=max_col)
                .map(|col| {
                    let recalculated = evaluated.and_then(|wb| formula_value(sheet, wb, col, row));
                    recalculated.unwrap_or_else(|| get_cell_text(sheet, col, row, &opts))
                })
                .collect()
        })
        .collect();

    Table::from_rows(rows)
}

/// First sheet of a workbook, used for the supplier directory.
pub fn read_first_sheet(path: &Path) -> Result<Table> {
    let workbook = open_workbook(path)?;
    let sheet = workbook.get_sheet(&0).ok_or_else(|| Error::InvalidExcel {
        path: path.to_path_buf(),
        details: "workbook has no sheets".to_string(),
    })?;
    Ok(read_table(sheet, None))
}

fn formula_value(sheet: &Worksheet, workbook: &EvaluatedWorkbook, col: u32, row: u32) -> Option<String> {
    let cell = sheet.get_cell((col, row))?;
    if cell.get_formula().is_empty() {
        return None;
    }
    workbook.get_value(sheet.get_name(), row, col)
}

/// A cell's text the way a user sees it. Date-formatted serials become
/// `YYYY-MM-DD HH:MM:SS`; `General` numbers keep their raw digits so long
/// article codes are not turned into scientific notation.
fn get_cell_text(sheet: &Worksheet, col: u32, row: u32, opts: &FormatOptions) -> String {
    let Some(cell) = sheet.get_cell((col, row)) else {
        return String::new();
    };

    let raw_value = cell.get_value();
    if raw_value.is_empty() {
        return String::new();
    }

    let format_code = cell
        .get_style()
        .get_number_format()
        .map(|nf| nf.get_format_code())
        .unwrap_or("General");

    let Ok(num) = raw_value.parse::<f64>() else {
        return raw_value.trim().to_string();
    };

    if is_date_format(format_code) {
        if let Some(dt) = serial_to_datetime(num) {
            return dt.format("%Y-%m-%d %H:%M:%S").to_string();
        }
    }

    if format_code.eq_ignore_ascii_case("General") || format_code == "@" {
        return raw_value.to_string();
    }

    match NumberFormat::parse(format_code) {
        Ok(fmt) => fmt.format(num, opts),
        Err(_) => raw_value.to_string(),
    }
}

/// Whether a number format code renders a date: it has a day or year token
/// outside quoted literals and `[...]` sections.
fn is_date_format(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'd' | 'D' | 'y' | 'Y' if !in_quotes && !in_brackets => return true,
            _ => {}
        }
    }
    false
}

/// Excel 1900 date system: serial 1 is 1900-01-01, with the fictitious
/// 1900-02-29 absorbed by counting from 1899-12-30.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;

    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days as u64))?;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(seconds))
}
