/// A sheet read as text: the first non-empty row is the header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based row number in the source sheet.
    pub line: usize,
    pub cells: Vec<String>,
}

impl Table {
    /// Build a table from raw rows, numbered from 1. Blank rows are skipped.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Table {
        let mut rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| Record { line: i + 1, cells })
            .filter(|r| r.cells.iter().any(|c| !c.trim().is_empty()));

        let Some(header) = rows.next() else {
            return Table::default();
        };

        Table {
            headers: header.cells.iter().map(|h| h.trim().to_string()).collect(),
            records: rows.collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First column whose header contains `needle`, case-insensitively.
    pub fn find_column(&self, needle: &str) -> Option<usize> {
        self.find_any(&[needle], &[])
    }

    /// First column whose header contains any of `needles`, ignoring the
    /// columns listed in `skip`.
    pub fn find_any(&self, needles: &[&str], skip: &[usize]) -> Option<usize> {
        self.headers.iter().enumerate().position(|(i, h)| {
            let h = h.to_lowercase();
            !skip.contains(&i) && needles.iter().any(|n| h.contains(n))
        })
    }

    /// Column whose trimmed header equals `name`, case-insensitively.
    pub fn find_exact(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name.trim()))
    }
}

impl Record {
    /// Cell text, or `None` when the row is shorter than the header.
    pub fn get(&self, col: usize) -> Option<&str> {
        self.cells.get(col).map(String::as_str)
    }
}
