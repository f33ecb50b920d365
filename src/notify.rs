//! Localized one-shot notices. A handler that redirects sets a flash
//! cookie carrying the message key; the next rendered page resolves it
//! against the viewer's language, shows it once, and clears the cookie.

use crate::i18n::{translate, Lang, MessageKey};

pub const FLASH_COOKIE: &str = "vitrina_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_key(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }
}

/// A notice resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
}

impl Notice {
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

pub fn notice(lang: Lang, key: MessageKey, severity: Severity) -> Notice {
    Notice {
        text: translate(lang, key).to_string(),
        severity,
    }
}

/// Cookie value format is "key.severity". Both parts are fixed
/// identifiers, never free text.
pub fn flash_cookie(key: MessageKey, severity: Severity) -> String {
    format!(
        "{}={}.{}; HttpOnly; SameSite=Lax; Path=/; Max-Age=60",
        FLASH_COOKIE,
        key.as_key(),
        severity.as_key()
    )
}

pub fn clear_flash_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", FLASH_COOKIE)
}

pub fn decode_flash(value: &str) -> Option<(MessageKey, Severity)> {
    let (key_part, severity_part) = value.split_once('.')?;
    let key = MessageKey::from_key(key_part)?;
    let severity = Severity::from_key(severity_part)?;
    Some((key, severity))
}
