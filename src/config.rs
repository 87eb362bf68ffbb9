//! Run configuration, read from a TOML file.
//!
//! Every field has a default, rooted at the current directory. Draft and
//! SMTP dispatch also need a sender: `dispatch.sender`, or `test_address`
//! when that is unset. Only `mode = "preview"` runs without one.
//!
//! ```toml
//! base_folder = 'C:\Automations\Inkoop\Chaselist'
//! supplier_directory = "Input/Leveranciers informatie.xlsx"
//! test_mode = true
//! test_address = "inkoop@example.com"
//! unknown_supplier = "skip"
//!
//! [dispatch]
//! mode = "draft"
//! outbox = "Outbox"
//! ```

use crate::composer::Placeholders;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_base_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_chase_prefix() -> String {
    "Chase".to_string()
}

fn default_supplier_directory() -> PathBuf {
    PathBuf::from("Input").join("Leveranciers informatie.xlsx")
}

fn default_layouts_folder() -> PathBuf {
    PathBuf::from("Layouts")
}

fn default_nl_template() -> PathBuf {
    PathBuf::from("NL.txt")
}

fn default_en_template() -> PathBuf {
    PathBuf::from("EN.txt")
}

fn default_true() -> bool {
    true
}

fn default_outbox() -> PathBuf {
    PathBuf::from("Outbox")
}

fn default_smtp_port() -> u16 {
    587
}

/// What to do with suppliers missing from the supplier directory.
#[derive(Debug, Clone, Copy, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSupplierPolicy {
    /// Leave them out of the run.
    #[default]
    Skip,
    /// Mail them in Dutch with a generic salutation to the test address.
    Fallback,
}

/// Where composed mails go.
#[derive(Debug, Clone, Copy, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Unsent `.eml` drafts in the outbox folder, opened in the mail client.
    #[default]
    Draft,
    /// Send over SMTP.
    Smtp,
    /// Log only.
    Preview,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Plain connection without STARTTLS, for local relays.
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "default_outbox")]
    pub outbox: PathBuf,
    /// `From` address. Drafts may leave it out; SMTP needs it.
    #[serde(default)]
    pub sender: Option<String>,
    /// HTML signature appended after the body, e.g. the mail client's
    /// exported signature file.
    #[serde(default)]
    pub signature_file: Option<PathBuf>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            mode: DispatchMode::default(),
            outbox: default_outbox(),
            sender: None,
            signature_file: None,
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_folder")]
    pub base_folder: PathBuf,
    /// Chase workbooks are files starting with this prefix.
    #[serde(default = "default_chase_prefix")]
    pub chase_prefix: String,
    #[serde(default = "default_supplier_directory")]
    pub supplier_directory: PathBuf,
    #[serde(default = "default_layouts_folder")]
    pub layouts_folder: PathBuf,
    #[serde(default = "default_nl_template")]
    pub nl_template: PathBuf,
    #[serde(default = "default_en_template")]
    pub en_template: PathBuf,
    #[serde(default)]
    pub placeholders: Placeholders,
    /// Company name in the subject line.
    #[serde(default)]
    pub company: Option<String>,
    /// Address every mail to `test_address`.
    #[serde(default)]
    pub test_mode: bool,
    /// Test recipient, also used when a supplier has no address.
    #[serde(default)]
    pub test_address: String,
    #[serde(default)]
    pub unknown_supplier: UnknownSupplierPolicy,
    #[serde(default = "default_true")]
    pub sort_by_delivery: bool,
    /// Recalculate formulas before reading the chase sheet.
    #[serde(default)]
    pub recalculate: bool,
    /// Reference date for overdue marking; defaults to the local date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_folder: default_base_folder(),
            chase_prefix: default_chase_prefix(),
            supplier_directory: default_supplier_directory(),
            layouts_folder: default_layouts_folder(),
            nl_template: default_nl_template(),
            en_template: default_en_template(),
            placeholders: Placeholders::default(),
            company: None,
            test_mode: false,
            test_address: String::new(),
            unknown_supplier: UnknownSupplierPolicy::default(),
            sort_by_delivery: true,
            recalculate: false,
            today: None,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Config {
    /// Read a TOML config. A relative `base_folder` is taken relative to
    /// the config file's folder.
    pub fn from_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let mut cfg: Config = toml::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        if cfg.base_folder.is_relative() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            cfg.base_folder = dir.join(&cfg.base_folder);
        }
        Ok(cfg)
    }

    /// `path` under the base folder, unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_folder.join(path)
        }
    }

    pub fn supplier_directory_path(&self) -> PathBuf {
        self.resolve(&self.supplier_directory)
    }

    pub fn template_paths(&self) -> (PathBuf, PathBuf) {
        let layouts = self.resolve(&self.layouts_folder);
        (layouts.join(&self.nl_template), layouts.join(&self.en_template))
    }

    pub fn outbox_path(&self) -> PathBuf {
        self.resolve(&self.dispatch.outbox)
    }

    pub fn signature_path(&self) -> Option<PathBuf> {
        self.dispatch.signature_file.as_deref().map(|p| self.resolve(p))
    }
}
