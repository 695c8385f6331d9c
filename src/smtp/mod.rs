//! SMTP session prober.
//!
//! [`TcpProber`] opens a plain TCP connection to one exchanger and walks the
//! dialogue `banner → EHLO/HELO → MAIL FROM → RCPT TO → (catch-all RCPT) →
//! QUIT`, stopping at the first reply that settles the outcome. Replies are
//! read by [`read_reply`] and turned into verdicts by the
//! [`ReplyClassifier`](crate::policy::ReplyClassifier).

mod options;
mod probe;
mod reply;
mod session;
mod util;

pub use options::ProbeOptions;
pub use probe::{ProbeTarget, SmtpProber, TcpProber};
pub use reply::{ProtocolReply, ReplyError, read_reply};
pub use util::random_local_part;
