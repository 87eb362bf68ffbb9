//! Hand-off of composed mails.
//!
//! The default [`DraftDispatcher`] writes each mail as an unsent `.eml`
//! draft; double-clicking it opens a ready-to-send message in Outlook,
//! Thunderbird or Apple Mail, so the buyer still reviews every reminder.

use crate::composer::RenderedMail;
use crate::config::{Config, DispatchMode, SmtpConfig};
use crate::error::{MailError, Result};
use chrono::{Local, NaiveDateTime};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::path::{Path, PathBuf};

pub trait Dispatcher {
    fn dispatch(&mut self, mail: &RenderedMail) -> Result<()>;
}

/// Build the dispatcher selected in the config.
pub fn from_config(config: &Config) -> Result<Box<dyn Dispatcher>> {
    let signature = match config.signature_path() {
        Some(path) => Some(load_signature(&path)?),
        None => None,
    };

    let sender = || -> Result<Mailbox> {
        let address = config
            .dispatch
            .sender
            .as_deref()
            .or(Some(config.test_address.as_str()).filter(|a| !a.trim().is_empty()))
            .ok_or_else(|| MailError::MissingConfig("dispatch.sender".to_string()))?;
        Ok(parse_mailbox(address)?)
    };

    Ok(match config.dispatch.mode {
        DispatchMode::Draft => Box::new(DraftDispatcher::new(
            config.outbox_path(),
            sender()?,
            signature,
            Local::now().naive_local(),
        )),
        DispatchMode::Smtp => {
            let smtp = config
                .dispatch
                .smtp
                .as_ref()
                .ok_or_else(|| MailError::MissingConfig("dispatch.smtp".to_string()))?;
            Box::new(SmtpDispatcher::new(smtp, sender()?, signature)?)
        }
        DispatchMode::Preview => Box::new(PreviewDispatcher),
    })
}

fn load_signature(path: &Path) -> Result<String> {
    let signature = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loaded mail signature");
    Ok(signature)
}

/// The complete HTML part: body, then the signature block if there is one.
pub fn html_document(body: &str, signature: Option<&str>) -> String {
    match signature {
        Some(sig) => format!("<html><body>{}<br>{}</body></html>", body, sig),
        None => format!("<html><body>{}</body></html>", body),
    }
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

fn build_message(from: &Mailbox, mail: &RenderedMail, signature: Option<&str>) -> Result<Message> {
    let message = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&mail.recipient)?)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(html_document(&mail.html_body, signature))
        .map_err(|e| MailError::Build(e.to_string()))?;
    Ok(message)
}

/// Writes `<run start>_NN_<supplier>.eml` drafts into the outbox folder.
/// Drafts of earlier runs stay in place and sort before the new ones.
pub struct DraftDispatcher {
    outbox: PathBuf,
    run_stamp: String,
    from: Mailbox,
    signature: Option<String>,
    written: usize,
}

impl DraftDispatcher {
    pub fn new(outbox: PathBuf, from: Mailbox, signature: Option<String>, started: NaiveDateTime) -> Self {
        DraftDispatcher {
            outbox,
            run_stamp: started.format("%Y%m%d_%H%M%S").to_string(),
            from,
            signature,
            written: 0,
        }
    }

    fn draft_path(&self, supplier: &str) -> PathBuf {
        let name: String = supplier
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.outbox
            .join(format!("{}_{:02}_{}.eml", self.run_stamp, self.written + 1, name))
    }
}

impl Dispatcher for DraftDispatcher {
    fn dispatch(&mut self, mail: &RenderedMail) -> Result<()> {
        let message = build_message(&self.from, mail, self.signature.as_deref())?;

        // X-Unsent makes mail clients open the file as an editable draft.
        let mut bytes = b"X-Unsent: 1\r\n".to_vec();
        bytes.extend(message.formatted());

        std::fs::create_dir_all(&self.outbox)?;
        let path = self.draft_path(&mail.supplier);
        std::fs::write(&path, bytes)?;
        self.written += 1;

        tracing::info!(
            supplier = %mail.supplier,
            to = %mail.recipient,
            language = mail.language.code(),
            draft = %path.display(),
            "draft ready"
        );
        Ok(())
    }
}

pub struct SmtpDispatcher {
    transport: SmtpTransport,
    from: Mailbox,
    signature: Option<String>,
}

impl SmtpDispatcher {
    pub fn new(config: &SmtpConfig, from: Mailbox, signature: Option<String>) -> Result<Self> {
        let builder = if config.insecure {
            SmtpTransport::builder_dangerous(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host).map_err(|e| MailError::Smtp(e.to_string()))?
        };

        let mut builder = builder.port(config.port);
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(SmtpDispatcher {
            transport: builder.build(),
            from,
            signature,
        })
    }
}

impl Dispatcher for SmtpDispatcher {
    fn dispatch(&mut self, mail: &RenderedMail) -> Result<()> {
        let message = build_message(&self.from, mail, self.signature.as_deref())?;
        self.transport
            .send(&message)
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!(supplier = %mail.supplier, to = %mail.recipient, "mail sent");
        Ok(())
    }
}

/// Dry run: log what would be sent.
pub struct PreviewDispatcher;

impl Dispatcher for PreviewDispatcher {
    fn dispatch(&mut self, mail: &RenderedMail) -> Result<()> {
        tracing::info!(
            supplier = %mail.supplier,
            to = %mail.recipient,
            language = mail.language.code(),
            subject = %mail.subject,
            bytes = mail.html_body.len(),
            "preview"
        );
        Ok(())
    }
}
