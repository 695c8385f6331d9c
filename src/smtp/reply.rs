use std::io;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on continuation lines collected for one reply.
const MAX_REPLY_LINES: usize = 64;

static ENHANCED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[245]\.\d\.\d+").expect("static enhanced-code pattern")
});

/// One SMTP reply as received from the wire.
///
/// `status_code == 0` marks a reply whose first line did not start with three
/// digits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolReply {
    pub status_code: u16,
    pub enhanced_code: Option<String>,
    pub message: String,
    pub raw_lines: Vec<String>,
}

impl ProtocolReply {
    /// Build a reply from already collected lines (CRLF stripped).
    pub fn from_lines(raw_lines: Vec<String>) -> Self {
        let status_code = raw_lines.first().map(|l| status_code(l)).unwrap_or(0);

        let message = raw_lines
            .iter()
            .rev()
            .map(|line| line_text(line))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
            .to_string();

        let enhanced_code = raw_lines
            .iter()
            .find_map(|line| ENHANCED_CODE.find(line_text(line)))
            .map(|m| m.as_str().to_string());

        Self {
            status_code,
            enhanced_code,
            message,
            raw_lines,
        }
    }

    /// Convenience parser for a reply held in memory, e.g. `"550 5.1.1 User unknown"`.
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self::from_lines(lines)
    }

    pub fn is_malformed(&self) -> bool {
        self.status_code == 0
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Whether the enhanced code falls under `prefix`. `"5.7"` and `"5.7."`
    /// both match `5.7.1`; `"5.1.1"` matches `5.1.1` but not `5.1.10`.
    pub fn enhanced_matches(&self, prefix: &str) -> bool {
        let Some(code) = self.enhanced_code.as_deref() else {
            return false;
        };
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return false;
        }
        if prefix.ends_with('.') {
            return code.starts_with(prefix);
        }
        code == prefix
            || code
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// All text of the reply, lines joined, lowercased. Used for substring
    /// matching.
    pub fn lowercase_text(&self) -> String {
        let mut out = String::new();
        for line in &self.raw_lines {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&line_text(line).to_ascii_lowercase());
        }
        if out.is_empty() {
            self.message.to_ascii_lowercase()
        } else {
            out
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("timed out waiting for reply")]
    Timeout,
    #[error("reply wait cancelled")]
    Cancelled,
    #[error("connection closed while reading reply")]
    Closed,
    #[error("I/O error while reading reply: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
}

/// Read one (possibly multi-line) reply before `deadline`.
///
/// Only the first line is mandatory: a continuation that times out, closes
/// or carries a different code ends the reply with what was collected.
pub async fn read_reply<R>(
    reader: &mut R,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<ProtocolReply, ReplyError>
where
    R: AsyncBufRead + Unpin,
{
    let first = read_line(reader, deadline, cancel).await?;
    let code = status_code(&first);
    let multi = code != 0 && is_continuation(&first);
    let mut lines = vec![first];

    if multi {
        while lines.len() < MAX_REPLY_LINES {
            let Ok(line) = read_line(reader, deadline, cancel).await else {
                break;
            };
            if status_code(&line) != code {
                break;
            }
            let more = is_continuation(&line);
            lines.push(line);
            if !more {
                break;
            }
        }
    }

    Ok(ProtocolReply::from_lines(lines))
}

async fn read_line<R>(
    reader: &mut R,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<String, ReplyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let outcome = {
        let read = tokio::time::timeout_at(deadline, reader.read_until(b'\n', &mut buf));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = read => Some(res),
        }
    };
    let read = match outcome {
        None => return Err(ReplyError::Cancelled),
        Some(Err(_elapsed)) => return Err(ReplyError::Timeout),
        Some(Ok(res)) => res.map_err(|source| ReplyError::Io { source })?,
    };
    if read == 0 {
        return Err(ReplyError::Closed);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn status_code(line: &str) -> u16 {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return 0;
    }
    line[..3].parse().unwrap_or(0)
}

fn is_continuation(line: &str) -> bool {
    line.as_bytes().get(3) == Some(&b'-')
}

fn line_text(line: &str) -> &str {
    line.get(4..).unwrap_or("").trim()
}
