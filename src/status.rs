//! Status column normalization.
//!
//! The chase sheet's status column is mostly a lookup formula, so besides
//! free text it contains error markers (`#N/B` in Dutch Excel, `#N/A`) and
//! blanks. All of those mean "not known yet" and need a supplier follow-up.

const NOT_AVAILABLE: [&str; 6] = ["#n/b", "#n/a", "#na", "n/b", "n/a", "na"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `n/b`: status unknown, ask the supplier.
    NeedsFollowUp,
    /// `mail`: a reminder was explicitly requested.
    MailRequested,
    Other(String),
}

impl Status {
    pub fn normalize(raw: Option<&str>) -> Status {
        let Some(raw) = raw else {
            return Status::NeedsFollowUp;
        };

        let value = raw.trim().to_lowercase();
        if value.is_empty() || is_error_marker(&value) || NOT_AVAILABLE.contains(&value.as_str()) {
            return Status::NeedsFollowUp;
        }

        if value.contains("mail") {
            Status::MailRequested
        } else {
            Status::Other(value)
        }
    }

    pub fn as_token(&self) -> &str {
        match self {
            Status::NeedsFollowUp => "n/b",
            Status::MailRequested => "mail",
            Status::Other(s) => s,
        }
    }

    pub fn is_follow_up(&self) -> bool {
        matches!(self, Status::NeedsFollowUp | Status::MailRequested)
    }
}

/// Spreadsheet error values such as `#VALUE!`, `#REF!` or `#NAME?`.
fn is_error_marker(value: &str) -> bool {
    value.starts_with('#') && (value.ends_with('!') || value.ends_with('?'))
}
