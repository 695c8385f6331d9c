use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration knobs for [`TcpProber`](super::TcpProber).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeOptions {
    pub port: u16,
    /// Name announced in `EHLO`/`HELO`. Empty falls back to `localhost`.
    pub helo_domain: String,
    /// Envelope sender for `MAIL FROM`. Required; probing without one
    /// yields a tempfail verdict.
    pub mail_from: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub ehlo_timeout_ms: u64,
    /// Issue a second `RCPT TO` for a random local part after a success.
    pub catch_all_detection: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: "localhost".to_string(),
            mail_from: String::new(),
            connect_timeout_ms: 10_000,
            read_timeout_ms: 15_000,
            ehlo_timeout_ms: 10_000,
            catch_all_detection: true,
        }
    }
}

impl ProbeOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Deadline for the greeting exchange; falls back to the read timeout.
    pub fn ehlo_timeout(&self) -> Duration {
        if self.ehlo_timeout_ms == 0 {
            self.read_timeout()
        } else {
            Duration::from_millis(self.ehlo_timeout_ms)
        }
    }

    pub fn helo_name(&self) -> Cow<'_, str> {
        let trimmed = self.helo_domain.trim();
        if trimmed.is_empty() {
            Cow::Borrowed("localhost")
        } else {
            Cow::Borrowed(trimmed)
        }
    }

    pub fn probe_sender(&self) -> Option<&str> {
        let sender = self.mail_from.trim();
        (!sender.is_empty()).then_some(sender)
    }
}
