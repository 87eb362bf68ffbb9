//! Reminder mail composition: the order table plus a localized template.

use crate::article::format_article;
use crate::dates::ParsedDate;
use crate::directory::{Language, SupplierContact};
use crate::error::Result;
use crate::order::MAIL_COLUMNS;
use crate::pipeline::SupplierGroup;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

const TABLE_STYLE: &str = "border-collapse:collapse;font-family:Arial;font-size:9pt";
const HEADER_STYLE: &str = "background:#d8edf7;border:1px solid #999;padding:6px";
const CELL_STYLE: &str = "border:1px solid #999;padding:6px";
const TABLE_BLOCK: &str = "<div style='margin-top:10px;margin-bottom:4px'>";

/// Index of "Current delivery date" in [`MAIL_COLUMNS`].
const CURRENT_DELIVERY: usize = 4;
const REQUESTED_DELIVERY: usize = 5;

/// Tokens replaced in the layout texts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Placeholders {
    pub name: String,
    pub table: String,
    pub signature: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Placeholders {
            name: "<naam>".to_string(),
            table: "<tafel>".to_string(),
            signature: "<handtekening>".to_string(),
        }
    }
}

/// The Dutch and English layout texts.
#[derive(Debug, Clone)]
pub struct Templates {
    pub nl: String,
    pub en: String,
}

impl Templates {
    pub fn load(nl_path: &Path, en_path: &Path) -> Result<Templates> {
        Ok(Templates {
            nl: std::fs::read_to_string(nl_path)?,
            en: std::fs::read_to_string(en_path)?,
        })
    }

    pub fn for_language(&self, language: Language) -> &str {
        match language {
            Language::Nl => &self.nl,
            Language::En => &self.en,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub supplier: String,
    pub language: Language,
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

pub struct MailComposer {
    templates: Templates,
    placeholders: Placeholders,
    company: Option<String>,
}

impl MailComposer {
    pub fn new(templates: Templates, placeholders: Placeholders, company: Option<String>) -> Self {
        MailComposer {
            templates,
            placeholders,
            company: company.filter(|c| !c.trim().is_empty()),
        }
    }

    pub fn compose(
        &self,
        group: &SupplierGroup,
        contact: &SupplierContact,
        recipient: &str,
        today: NaiveDate,
    ) -> Result<RenderedMail> {
        let table = render_table(group, today)?;
        let template = self.templates.for_language(contact.language);

        Ok(RenderedMail {
            supplier: group.name.clone(),
            language: contact.language,
            recipient: recipient.to_string(),
            subject: self.subject(contact.language, &group.name),
            html_body: fill_template(template, &self.placeholders, contact.greeting_name(), &table),
        })
    }

    fn subject(&self, language: Language, supplier: &str) -> String {
        let phrase = match language {
            Language::Nl => "Openstaande bestelling(en)",
            Language::En => "Open purchase order(s)",
        };

        let mut parts = vec![phrase];
        parts.extend(self.company.as_deref());
        parts.push(supplier);
        parts.join(" - ")
    }
}

/// One row per order line, captions in English. Dates are shown as
/// `dd-mm-yyyy` (empty when unparsable); a current delivery date before
/// `today` is shown bold red.
pub fn render_table(group: &SupplierGroup, today: NaiveDate) -> Result<String> {
    let mut html = format!("<table style='{}'><tr>", TABLE_STYLE);
    for (_, caption) in MAIL_COLUMNS {
        html.push_str(&format!("<th style='{}'>{}</th>", HEADER_STYLE, caption));
    }
    html.push_str("</tr>");

    for line in &group.lines {
        let fields = line.mail_fields()?;
        html.push_str("<tr>");

        for (i, value) in fields.iter().enumerate() {
            let text = match i {
                0 => escape_html(&format_article(value)),
                CURRENT_DELIVERY => {
                    let date = ParsedDate::parse(Some(value));
                    if date.is_overdue(today) {
                        format!("<b><font color='red'>{}</font></b>", date.display())
                    } else {
                        date.display()
                    }
                }
                REQUESTED_DELIVERY => ParsedDate::parse(Some(value)).display(),
                _ => escape_html(value),
            };
            html.push_str(&format!("<td style='{}'>{}</td>", CELL_STYLE, text));
        }

        html.push_str("</tr>");
    }

    html.push_str("</table>");
    Ok(html)
}

/// Substitute the placeholders and turn the text's line breaks into `<br>`.
/// Runs of three or more breaks collapse to two, trailing breaks are cut,
/// and the table block drops one break on each side since its margins
/// already space it.
pub fn fill_template(template: &str, placeholders: &Placeholders, greeting: &str, table: &str) -> String {
    let body = template
        .replace(&placeholders.name, &escape_html(greeting))
        .replace(&placeholders.signature, "")
        .replace(&placeholders.table, &format!("{}{}</div>", TABLE_BLOCK, table))
        .replace('\r', "")
        .replace('\n', "<br>");

    normalize_breaks(&body)
}

fn normalize_breaks(body: &str) -> String {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let runs = RUNS.get_or_init(|| Regex::new(r"(<br>\s*){3,}").expect("valid regex"));
    let trailing = TRAILING.get_or_init(|| Regex::new(r"(<br>\s*)+$").expect("valid regex"));

    let body = runs.replace_all(body, "<br><br>");
    let body = trailing.replace(&body, "");
    body.replace("<br><div", "<div").replace("</div><br>", "</div>")
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
