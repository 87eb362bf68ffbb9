//! Typed purchase-order lines, mapped from the chase sheet's headers once
//! per run.

use crate::error::{Error, Result};
use crate::status::Status;
use crate::table::{Record, Table};

/// Source headers of the columns shown in a reminder mail, with the English
/// caption used in the mail table. Order is the table's column order.
pub const MAIL_COLUMNS: [(&str, &str); 6] = [
    ("Artikel", "Item"),
    ("Item leverancier", "Item supplier"),
    ("Bestelnummer", "Order number"),
    ("Regelnummer", "Line number"),
    ("Huidige leverdatum", "Current delivery date"),
    ("Gewenste leverdatum", "Requested delivery date"),
];

/// Column positions resolved from the header row.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub status: usize,
    pub supplier: usize,
    /// Positions of [`MAIL_COLUMNS`]; `None` when the sheet lacks one.
    pub mail: [Option<usize>; 6],
}

impl ColumnMap {
    /// Status: first header containing "status" (required). Supplier: first
    /// header containing "leverancier" that is not a mail column, else the
    /// second column.
    pub fn resolve(table: &Table) -> Result<ColumnMap> {
        let status = table
            .find_column("status")
            .ok_or_else(|| Error::ColumnNotFound("status".to_string()))?;

        let mail = MAIL_COLUMNS.map(|(header, _)| table.find_exact(header));

        // "Item leverancier" is a mail column, not the supplier name.
        let taken: Vec<usize> = mail.iter().flatten().copied().collect();
        let supplier = match table
            .find_any(&["leverancier"], &taken)
            .or_else(|| table.find_column("leverancier"))
        {
            Some(col) => col,
            None if table.headers.len() >= 2 => 1,
            None => return Err(Error::ColumnNotFound("leverancier".to_string())),
        };

        Ok(ColumnMap { status, supplier, mail })
    }

    pub fn missing_mail_columns(&self) -> Vec<&'static str> {
        MAIL_COLUMNS
            .iter()
            .zip(self.mail.iter())
            .filter(|(_, col)| col.is_none())
            .map(|((header, _), _)| *header)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub row: usize,
    pub supplier: String,
    pub status: String,
    pub item: Option<String>,
    pub supplier_item: Option<String>,
    pub order_number: Option<String>,
    pub line_number: Option<String>,
    pub current_delivery: Option<String>,
    pub requested_delivery: Option<String>,
}

impl OrderLine {
    pub fn from_record(record: &Record, columns: &ColumnMap) -> OrderLine {
        let text = |col: usize| record.get(col).unwrap_or_default().trim().to_string();
        // A known column with a short row reads as an empty cell; an
        // unknown column stays `None`.
        let field = |i: usize| columns.mail[i].map(|col| text(col));

        OrderLine {
            row: record.line,
            supplier: text(columns.supplier),
            status: text(columns.status),
            item: field(0),
            supplier_item: field(1),
            order_number: field(2),
            line_number: field(3),
            current_delivery: field(4),
            requested_delivery: field(5),
        }
    }

    pub fn normalized_status(&self) -> Status {
        Status::normalize(Some(&self.status))
    }

    /// Grouping key: lowercased, trimmed supplier name.
    pub fn supplier_key(&self) -> String {
        self.supplier.trim().to_lowercase()
    }

    /// The mail columns in table order, failing on the first one the sheet
    /// does not have.
    pub fn mail_fields(&self) -> Result<[&str; 6]> {
        let fields = [
            &self.item,
            &self.supplier_item,
            &self.order_number,
            &self.line_number,
            &self.current_delivery,
            &self.requested_delivery,
        ];

        let mut out = [""; 6];
        for (i, field) in fields.iter().enumerate() {
            out[i] = field.as_deref().ok_or_else(|| Error::TemplateFieldMissing {
                column: MAIL_COLUMNS[i].0.to_string(),
                row: self.row,
            })?;
        }
        Ok(out)
    }
}

/// Map every record of the sheet to an [`OrderLine`].
pub fn load_lines(table: &Table) -> Result<Vec<OrderLine>> {
    let columns = ColumnMap::resolve(table)?;

    let missing = columns.missing_mail_columns();
    if !missing.is_empty() {
        tracing::warn!(columns = ?missing, "sheet lacks mail columns; affected suppliers will fail");
    }
    tracing::debug!(
        status = %table.headers[columns.status],
        supplier = %table.headers[columns.supplier],
        "resolved columns"
    );

    Ok(table
        .records
        .iter()
        .map(|r| OrderLine::from_record(r, &columns))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn line(supplier: &str, status: &str, delivery: &str) -> OrderLine {
        OrderLine {
            row: 2,
            supplier: supplier.to_string(),
            status: status.to_string(),
            item: Some("402243612012".to_string()),
            supplier_item: Some("SUP-1".to_string()),
            order_number: Some("PO-100".to_string()),
            line_number: Some("1".to_string()),
            current_delivery: Some(delivery.to_string()),
            requested_delivery: Some("01-01-2025".to_string()),
        }
    }

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_resolve_columns() {
        let t = table(&[&[
            "Artikel",
            "Item leverancier",
            "Naam leverancier",
            "Bestelnummer",
            "Regelnummer",
            "Huidige leverdatum",
            "Gewenste leverdatum",
            "Status WK",
        ]]);
        let columns = ColumnMap::resolve(&t).unwrap();

        assert_eq!(columns.status, 7);
        assert_eq!(columns.supplier, 2);
        assert_eq!(columns.mail[1], Some(1));
        assert!(columns.missing_mail_columns().is_empty());
    }

    #[test]
    fn test_supplier_falls_back_to_second_column() {
        let t = table(&[&["Artikel", "Firma", "Status"]]);
        let columns = ColumnMap::resolve(&t).unwrap();
        assert_eq!(columns.supplier, 1);
        assert_eq!(columns.missing_mail_columns().len(), 5);
    }

    #[test]
    fn test_missing_status_column() {
        let t = table(&[&["Artikel", "Leverancier"]]);
        let err = ColumnMap::resolve(&t).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "status"));
    }

    #[test]
    fn test_mail_fields_missing_column() {
        let t = table(&[&["Artikel", "Leverancier", "Status"], &["123", " Acme ", "N/B"]]);
        let lines = load_lines(&t).unwrap();

        assert_eq!(lines[0].supplier, "Acme");
        assert_eq!(lines[0].item.as_deref(), Some("123"));
        let err = lines[0].mail_fields().unwrap_err();
        assert!(matches!(err, Error::TemplateFieldMissing { ref column, row: 2 } if column == "Item leverancier"));
    }

    #[test]
    fn test_mail_fields_in_order() {
        let l = line("Acme", "Mail", "10-01-2025");
        let fields = l.mail_fields().unwrap();
        assert_eq!(fields[0], "402243612012");
        assert_eq!(fields[4], "10-01-2025");
    }
}
