//! Supplier directory: contact name, mail language and address per supplier.
//!
//! The directory is a small sheet maintained by purchasing. Its first
//! column holds the supplier name; the other columns are recognized by
//! their header text.

use crate::error::Result;
use crate::reader;
use crate::table::{Record, Table};
use csv::ReaderBuilder;
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::path::Path;

const LANGUAGE_HEADERS: [&str; 3] = ["eng/nl", "taal", "language"];
const NAME_HEADERS: [&str; 3] = ["contact", "naam", "name"];
const MAIL_HEADER: &str = "mail";

/// Cell text that pandas-era sheets use for "empty".
const PLACEHOLDERS: [&str; 2] = ["nan", "none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Nl,
    En,
}

impl Language {
    pub fn salutation(self) -> &'static str {
        match self {
            Language::Nl => "heer/mevrouw",
            Language::En => "Sir/Madam",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Nl => "NL",
            Language::En => "EN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierContact {
    /// Supplier name as written in the directory, or the lookup key on a miss.
    pub supplier: String,
    pub language: Language,
    pub contact_name: Option<String>,
    pub email: Option<String>,
}

impl SupplierContact {
    fn unknown(key: &str) -> SupplierContact {
        SupplierContact {
            supplier: key.to_string(),
            language: Language::Nl,
            contact_name: None,
            email: None,
        }
    }

    /// Name used after "Geachte"/"Dear": the contact, or a generic salutation.
    pub fn greeting_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .unwrap_or_else(|| self.language.salutation())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupplierDirectory {
    table: Table,
    language: Option<usize>,
    name: Option<usize>,
    email: Option<usize>,
}

impl SupplierDirectory {
    pub fn from_table(table: Table) -> SupplierDirectory {
        // Column 0 is the supplier name and never doubles as an optional column.
        let email = table.find_any(&[MAIL_HEADER], &[0]);
        let language = table.find_any(&LANGUAGE_HEADERS, &[0]);
        let mut taken = vec![0];
        taken.extend(email);
        taken.extend(language);
        let name = table.find_any(&NAME_HEADERS, &taken);

        SupplierDirectory {
            table,
            language,
            name,
            email,
        }
    }

    /// Load a directory workbook (first sheet) or CSV file. A missing file
    /// gives an empty directory.
    pub fn load(path: &Path) -> Result<SupplierDirectory> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "supplier directory not found; using defaults");
            return Ok(SupplierDirectory::default());
        }

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        let table = if is_csv {
            read_csv(path)?
        } else {
            reader::read_first_sheet(path)?
        };

        let directory = SupplierDirectory::from_table(table);
        tracing::info!(
            path = %path.display(),
            suppliers = directory.len(),
            "loaded supplier directory"
        );
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.table.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    fn find(&self, key: &str) -> Option<&Record> {
        let key = key.trim().to_lowercase();
        self.table
            .records
            .iter()
            .find(|r| r.get(0).is_some_and(|name| name.trim().to_lowercase() == key))
    }

    /// Contact details for `key`. A miss yields NL with no name or address.
    pub fn contact_for(&self, key: &str) -> SupplierContact {
        let Some(record) = self.find(key) else {
            return SupplierContact::unknown(key);
        };

        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).and_then(non_placeholder);

        let language = match cell(self.language) {
            Some(v) if v.to_uppercase().contains("EN") => Language::En,
            _ => Language::Nl,
        };

        SupplierContact {
            supplier: record.get(0).unwrap_or(key).trim().to_string(),
            language,
            contact_name: cell(self.name).map(str::to_string),
            email: cell(self.email).map(str::to_string),
        }
    }
}

fn non_placeholder(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || PLACEHOLDERS.contains(&value.to_lowercase().as_str()) {
        None
    } else {
        Some(value)
    }
}

/// Read a CSV directory. Semicolons are accepted as the separator, as
/// written by a Dutch-locale Excel.
fn read_csv(path: &Path) -> Result<Table> {
    let text = decode_csv(&std::fs::read(path)?);
    let delimiter = sniff_delimiter(text.lines().next().unwrap_or_default());

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Table::from_rows(rows))
}

/// UTF-8 (with or without BOM), else Windows-1252 as written by Excel on a
/// Dutch locale.
fn decode_csv(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    tracing::debug!("supplier directory is not UTF-8; reading as Windows-1252");
    WINDOWS_1252.decode(bytes).0.into_owned()
}

fn sniff_delimiter(header: &str) -> u8 {
    let semicolons = header.matches(';').count();
    if semicolons > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(rows: &[&[&str]]) -> SupplierDirectory {
        SupplierDirectory::from_table(Table::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        ))
    }

    fn sample() -> SupplierDirectory {
        directory(&[
            &["Leveranciersnaam", "ENG/NL", "Contactpersoon", "E-mailadres"],
            &["Acme B.V.", "NL", "Jan de Vries", "jan@acme.nl"],
            &["Bolt Ltd", "ENG", "nan", "orders@bolt.co.uk"],
            &["Cogs GmbH", "en", "", "None"],
        ])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = sample();
        let contact = dir.contact_for("  acme b.v. ");

        assert_eq!(contact.supplier, "Acme B.V.");
        assert_eq!(contact.language, Language::Nl);
        assert_eq!(contact.greeting_name(), "Jan de Vries");
        assert_eq!(contact.email.as_deref(), Some("jan@acme.nl"));
        assert!(dir.contains("ACME B.V."));
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn test_placeholder_name_uses_salutation() {
        let dir = sample();

        let bolt = dir.contact_for("bolt ltd");
        assert_eq!(bolt.language, Language::En);
        assert_eq!(bolt.contact_name, None);
        assert_eq!(bolt.greeting_name(), "Sir/Madam");

        let cogs = dir.contact_for("cogs gmbh");
        assert_eq!(cogs.language, Language::En);
        assert_eq!(cogs.email, None);
    }

    #[test]
    fn test_miss_defaults_to_dutch() {
        let contact = sample().contact_for("unknown");
        assert_eq!(contact.language, Language::Nl);
        assert_eq!(contact.greeting_name(), "heer/mevrouw");
        assert_eq!(contact.email, None);
        assert!(!SupplierDirectory::default().contains("acme"));
    }

    #[test]
    fn test_mail_column_not_used_as_name() {
        let dir = directory(&[
            &["Leverancier", "Contact e-mail", "Naam"],
            &["Acme", "info@acme.nl", "Piet"],
        ]);
        let contact = dir.contact_for("acme");
        assert_eq!(contact.email.as_deref(), Some("info@acme.nl"));
        assert_eq!(contact.contact_name.as_deref(), Some("Piet"));
    }

    #[test]
    fn test_load_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leveranciers.csv");
        std::fs::write(&path, "Leverancier;Taal;Contactnaam;Mail\nBolt Ltd;EN;Sam;sam@bolt.co.uk\n").unwrap();

        let directory = SupplierDirectory::load(&path).unwrap();
        let contact = directory.contact_for("bolt ltd");
        assert_eq!(contact.language, Language::En);
        assert_eq!(contact.greeting_name(), "Sam");
        assert_eq!(contact.email.as_deref(), Some("sam@bolt.co.uk"));
    }

    #[test]
    fn test_load_windows_1252_csv_with_commas_in_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leveranciers.csv");
        std::fs::write(
            &path,
            b"Leverancier;Naam, voornaam;Mail\r\nM\xfcller GmbH;M\xfcller, Hans;hans@mueller.de\r\n",
        )
        .unwrap();

        let directory = SupplierDirectory::load(&path).unwrap();
        let contact = directory.contact_for("müller gmbh");
        assert_eq!(contact.supplier, "Müller GmbH");
        assert_eq!(contact.greeting_name(), "Müller, Hans");
        assert_eq!(contact.email.as_deref(), Some("hans@mueller.de"));
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("Leverancier;Naam, voornaam;Mail"), b';');
        assert_eq!(sniff_delimiter("Leverancier,Taal,Mail"), b',');
        assert_eq!(sniff_delimiter("Leverancier"), b',');
    }

    #[test]
    fn test_load_missing_file() {
        let directory = SupplierDirectory::load(Path::new("/nonexistent/leveranciers.xlsx")).unwrap();
        assert!(directory.is_empty());
    }
}
