//! One end-to-end chase run: workbook in, one reminder per supplier out.

use crate::composer::{MailComposer, Templates};
use crate::config::{Config, UnknownSupplierPolicy};
use crate::directory::{SupplierContact, SupplierDirectory};
use crate::dispatch::Dispatcher;
use crate::error::{Error, MailError, Result};
use crate::evaluator::EvaluatedWorkbook;
use crate::order::{self, OrderLine};
use crate::pipeline::{self, SupplierGroup};
use crate::reader;
use chrono::{Local, NaiveDate};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub mailed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Read the latest WK sheet of `path` into order lines.
pub fn load_chase_sheet(path: &Path, recalculate: bool) -> Result<Vec<OrderLine>> {
    let workbook = reader::open_workbook(path)?;
    let names = reader::sheet_names(&workbook);
    let sheet_name = reader::latest_week_sheet(&names).ok_or_else(|| Error::NoWeekSheet(path.to_path_buf()))?;
    tracing::info!(sheet = sheet_name, "using latest WK sheet");

    let evaluated = if recalculate {
        Some(EvaluatedWorkbook::load(path)?)
    } else {
        None
    };

    let table = reader::read_table(reader::get_sheet(&workbook, sheet_name)?, evaluated.as_ref());
    if table.is_empty() {
        tracing::warn!(sheet = sheet_name, "sheet has no data rows");
        return Ok(Vec::new());
    }
    order::load_lines(&table)
}

/// Recipient for a supplier: its directory address, or the test address in
/// test mode and when the directory has none.
pub fn resolve_recipient(config: &Config, contact: &SupplierContact) -> Result<String> {
    if !config.test_mode {
        if let Some(email) = &contact.email {
            return Ok(email.clone());
        }
    }

    let fallback = config.test_address.trim();
    if fallback.is_empty() {
        return Err(MailError::MissingConfig("test_address".to_string()).into());
    }
    Ok(fallback.to_string())
}

pub struct ChaseRun<'a> {
    config: &'a Config,
    directory: SupplierDirectory,
    composer: MailComposer,
    today: NaiveDate,
}

impl<'a> ChaseRun<'a> {
    /// Load the supplier directory and mail layouts named in `config`.
    pub fn new(config: &'a Config) -> Result<Self> {
        let directory = SupplierDirectory::load(&config.supplier_directory_path())?;
        let (nl, en) = config.template_paths();
        let templates = Templates::load(&nl, &en)?;

        Ok(ChaseRun {
            config,
            directory,
            composer: MailComposer::new(templates, config.placeholders.clone(), config.company.clone()),
            today: config.today.unwrap_or_else(|| Local::now().date_naive()),
        })
    }

    /// Process the chase workbook at `input`, or the newest one in the base
    /// folder. Errors for a single supplier are logged and counted; only
    /// problems with the workbook itself abort the run.
    pub fn run(&self, input: Option<&Path>, dispatcher: &mut dyn Dispatcher) -> Result<RunReport> {
        let path = match input {
            Some(path) => path.to_path_buf(),
            None => reader::find_chase_file(&self.config.base_folder, &self.config.chase_prefix)?,
        };

        let selected = pipeline::classify(load_chase_sheet(&path, self.config.recalculate)?);
        let mut report = RunReport::default();
        if selected.is_empty() {
            tracing::warn!("no rows with status n/b or mail");
            return Ok(report);
        }

        for (key, mut group) in pipeline::group_by_supplier(selected) {
            if !self.is_known(&key) {
                tracing::warn!(supplier = %group.name, "not in supplier directory; skipping");
                report.skipped += 1;
                continue;
            }

            if self.config.sort_by_delivery {
                pipeline::sort_group(&mut group);
            }

            match self.process_group(&group, dispatcher) {
                Ok(()) => report.mailed += 1,
                Err(e) => {
                    tracing::error!(supplier = %group.name, error = %e, "failed to prepare mail");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            mailed = report.mailed,
            skipped = report.skipped,
            failed = report.failed,
            "done"
        );
        Ok(report)
    }

    /// Without a directory every supplier counts as known.
    fn is_known(&self, key: &str) -> bool {
        self.config.unknown_supplier == UnknownSupplierPolicy::Fallback
            || self.directory.is_empty()
            || self.directory.contains(key)
    }

    fn process_group(&self, group: &SupplierGroup, dispatcher: &mut dyn Dispatcher) -> Result<()> {
        let contact = self.directory.contact_for(&group.key);
        let recipient = resolve_recipient(self.config, &contact)?;

        tracing::info!(
            supplier = %group.name,
            rows = group.lines.len(),
            language = contact.language.code(),
            to = %recipient,
            "composing mail"
        );

        let mail = self.composer.compose(group, &contact, &recipient, self.today)?;
        dispatcher.dispatch(&mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::RenderedMail;
    use crate::directory::Language;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use umya_spreadsheet::structs::Worksheet;

    impl Dispatcher for Vec<RenderedMail> {
        fn dispatch(&mut self, mail: &RenderedMail) -> Result<()> {
            self.push(mail.clone());
            Ok(())
        }
    }

    const HEADERS: [&str; 8] = [
        "Artikel",
        "Leverancier",
        "Item leverancier",
        "Bestelnummer",
        "Regelnummer",
        "Huidige leverdatum",
        "Gewenste leverdatum",
        "Status",
    ];

    fn fill(sheet: &mut Worksheet, headers: &[&str], rows: &[[&str; 8]]) {
        for (c, header) in headers.iter().enumerate() {
            sheet.get_cell_mut((c as u32 + 1, 1u32)).set_value(*header);
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.get_cell_mut((c as u32 + 1, r as u32 + 2)).set_value(*value);
                }
            }
        }
    }

    fn write_chase(dir: &Path, headers: &[&str], rows: &[[&str; 8]]) -> PathBuf {
        let mut book = umya_spreadsheet::new_file();
        {
            let sheet = book.get_sheet_mut(&0).unwrap();
            sheet.set_name("WK10");
            fill(sheet, &HEADERS, &[["1", "Old", "", "", "", "", "", "N/B"]]);
        }
        fill(book.new_sheet("WK23").unwrap(), headers, rows);
        book.new_sheet("WK5").unwrap();

        let path = dir.join("Chase wk23.xlsx");
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();
        path
    }

    fn setup(directory: &str) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Layouts")).unwrap();
        fs::write(dir.path().join("Layouts").join("NL.txt"), "Geachte <naam>,\n\n<tafel>\nGroet,\n<handtekening>").unwrap();
        fs::write(dir.path().join("Layouts").join("EN.txt"), "Dear <naam>,\n\n<tafel>\nRegards,\n<handtekening>").unwrap();
        fs::write(dir.path().join("leveranciers.csv"), directory).unwrap();

        let mut config = Config::default();
        config.base_folder = dir.path().to_path_buf();
        config.supplier_directory = PathBuf::from("leveranciers.csv");
        config.test_address = "test@example.com".to_string();
        config.today = NaiveDate::from_ymd_opt(2025, 1, 8);
        (dir, config)
    }

    fn acme_rows() -> Vec<[&'static str; 8]> {
        vec![
            ["402243612012", "Acme", "A-1", "PO-1", "1", "10-01-2025", "01-01-2025", "N/B"],
            ["12345", "acme ", "A-2", "PO-1", "2", "", "01-01-2025", "Mail"],
            ["555", "Other", "O-1", "PO-2", "1", "10-01-2025", "", "Done"],
            ["777", "ACME", "A-3", "PO-3", "1", "05-01-2025", "01-01-2025", "#N/A"],
        ]
    }

    #[test]
    fn test_end_to_end() {
        let (dir, config) = setup("Leverancier,Taal,Contactnaam,E-mail\nAcme,EN,Sam,sam@acme.com\n");
        write_chase(dir.path(), &HEADERS, &acme_rows());

        let mut mails: Vec<RenderedMail> = Vec::new();
        let report = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap();

        assert_eq!(report, RunReport { mailed: 1, skipped: 0, failed: 0 });
        let mail = &mails[0];
        assert_eq!(mail.supplier, "Acme");
        assert_eq!(mail.language, Language::En);
        assert_eq!(mail.recipient, "sam@acme.com");
        assert_eq!(mail.subject, "Open purchase order(s) - Acme");
        assert!(mail.html_body.starts_with("Dear Sam,"));
        assert_eq!(mail.html_body.matches("<tr>").count(), 4);

        // Sorted by current delivery date, undated last.
        let first = mail.html_body.find("A-3").unwrap();
        let second = mail.html_body.find("A-1").unwrap();
        let third = mail.html_body.find("A-2").unwrap();
        assert!(first < second && second < third);
        assert!(mail.html_body.contains("4022.436.12012"));
        assert!(mail.html_body.contains("<b><font color='red'>05-01-2025</font></b>"));
    }

    #[test]
    fn test_test_mode_overrides_recipient() {
        let (dir, mut config) = setup("Leverancier,E-mail\nAcme,sam@acme.com\n");
        config.test_mode = true;
        let input = write_chase(dir.path(), &HEADERS, &acme_rows());

        let mut mails: Vec<RenderedMail> = Vec::new();
        ChaseRun::new(&config).unwrap().run(Some(input.as_path()), &mut mails).unwrap();

        assert_eq!(mails[0].recipient, "test@example.com");
        assert_eq!(mails[0].language, Language::Nl);
        assert!(mails[0].html_body.starts_with("Geachte heer/mevrouw,"));
    }

    #[test]
    fn test_unknown_supplier_policy() {
        let (dir, mut config) = setup("Leverancier,E-mail\nBolt,bolt@example.com\n");
        write_chase(dir.path(), &HEADERS, &acme_rows());

        let mut mails: Vec<RenderedMail> = Vec::new();
        let report = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap();
        assert_eq!(report, RunReport { mailed: 0, skipped: 1, failed: 0 });
        assert!(mails.is_empty());

        config.unknown_supplier = UnknownSupplierPolicy::Fallback;
        let report = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap();
        assert_eq!(report.mailed, 1);
        assert_eq!(mails[0].recipient, "test@example.com");
    }

    #[test]
    fn test_failures_are_per_supplier() {
        let (dir, mut config) = setup("Leverancier,E-mail\nAcme,\nBolt,bolt@example.com\n");
        config.test_address = String::new();
        let mut rows = acme_rows();
        rows.push(["888", "Bolt", "B-1", "PO-9", "1", "", "", "mail"]);
        write_chase(dir.path(), &HEADERS, &rows);

        let mut mails: Vec<RenderedMail> = Vec::new();
        let report = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap();

        assert_eq!(report, RunReport { mailed: 1, skipped: 0, failed: 1 });
        assert_eq!(mails[0].recipient, "bolt@example.com");
    }

    #[test]
    fn test_missing_mail_column_fails_groups() {
        let (dir, config) = setup("Leverancier\nAcme\n");
        let mut headers = HEADERS;
        headers[3] = "Order";
        write_chase(dir.path(), &headers, &acme_rows());

        let mut mails: Vec<RenderedMail> = Vec::new();
        let report = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap();
        assert_eq!(report.failed, 1);
        assert!(mails.is_empty());
    }

    #[test]
    fn test_missing_status_column_is_fatal() {
        let (dir, config) = setup("Leverancier\nAcme\n");
        let mut headers = HEADERS;
        headers[7] = "Opmerking";
        write_chase(dir.path(), &headers, &acme_rows());

        let mut mails: Vec<RenderedMail> = Vec::new();
        let err = ChaseRun::new(&config).unwrap().run(None, &mut mails).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)));
    }

    #[test]
    fn test_no_week_sheet() {
        let (dir, config) = setup("Leverancier\nAcme\n");
        let mut book = umya_spreadsheet::new_file();
        book.get_sheet_mut(&0).unwrap().set_name("Overzicht");
        let path = dir.path().join("Chase.xlsx");
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        let mut mails: Vec<RenderedMail> = Vec::new();
        let err = ChaseRun::new(&config).unwrap().run(Some(path.as_path()), &mut mails).unwrap_err();
        assert!(matches!(err, Error::NoWeekSheet(_)));
    }

    #[test]
    fn test_load_selects_latest_week() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chase(dir.path(), &HEADERS, &acme_rows());

        let lines = load_chase_sheet(&path, false).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].supplier, "Acme");
        assert_eq!(lines[1].current_delivery.as_deref(), Some(""));

        let selected = pipeline::classify(lines);
        assert_eq!(selected.len(), 3);
        let groups = pipeline::group_by_supplier(selected);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["acme"].lines.len(), 3);
    }
}
