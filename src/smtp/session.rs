use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::reply::{ProtocolReply, ReplyError, read_reply};
use crate::verdict::{SmtpStep, Verdict};

const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// One open SMTP connection plus the transcript of what went over it.
///
/// Every read and write is bounded by its own deadline and by the session's
/// cancellation token. Transport failures come back as ready-made verdicts.
pub(crate) struct SmtpSession<S> {
    host: String,
    stream: BufReader<S>,
    cancel: CancellationToken,
    transcript: Vec<String>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, host: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            host: host.into(),
            stream: BufReader::new(stream),
            cancel,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    fn record(&mut self, direction: &str, line: &str) {
        trace!(host = %self.host, "{direction}: {line}");
        self.transcript
            .push(format!("[{}] {direction}: {line}", self.host));
    }

    pub(crate) async fn read(
        &mut self,
        step: SmtpStep,
        timeout: Duration,
    ) -> Result<ProtocolReply, Verdict> {
        let deadline = Instant::now() + timeout;
        match read_reply(&mut self.stream, deadline, &self.cancel).await {
            Ok(reply) => {
                for line in &reply.raw_lines {
                    self.record("S", line);
                }
                Ok(reply)
            }
            Err(err) => {
                self.record("!", &err.to_string());
                let verdict = match err {
                    ReplyError::Timeout | ReplyError::Cancelled => Verdict::smtp_timeout(),
                    ReplyError::Closed | ReplyError::Io { .. } => {
                        Verdict::smtp_tempfail("smtp_read_error")
                    }
                };
                Err(verdict.with_step(step).with_host(self.host.clone()))
            }
        }
    }

    pub(crate) async fn send(
        &mut self,
        step: SmtpStep,
        command: &str,
        timeout: Duration,
    ) -> Result<(), Verdict> {
        self.record("C", command);
        let mut data = Vec::with_capacity(command.len() + 2);
        data.extend_from_slice(command.as_bytes());
        data.extend_from_slice(b"\r\n");

        let Self { stream, cancel, .. } = self;
        let writer = stream.get_mut();
        let write = async {
            writer.write_all(&data).await?;
            writer.flush().await
        };
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = tokio::time::timeout(timeout, write) => Some(res),
        };

        let err = match outcome {
            Some(Ok(Ok(()))) => return Ok(()),
            None => None,
            Some(Err(_elapsed)) => None,
            Some(Ok(Err(err))) => Some(err),
        };
        let verdict = match &err {
            None => Verdict::smtp_timeout(),
            Some(err) if err.kind() == io::ErrorKind::TimedOut => Verdict::smtp_timeout(),
            Some(_) => Verdict::smtp_tempfail("smtp_write_error"),
        };
        let detail = err.map_or_else(|| "write timed out".to_string(), |err| err.to_string());
        self.record("!", &detail);
        Err(verdict.with_step(step).with_host(self.host.clone()))
    }

    pub(crate) async fn command(
        &mut self,
        step: SmtpStep,
        command: &str,
        timeout: Duration,
    ) -> Result<ProtocolReply, Verdict> {
        self.send(step, command, timeout).await?;
        self.read(step, timeout).await
    }

    /// Best-effort `QUIT`; errors are ignored.
    pub(crate) async fn quit(&mut self, timeout: Duration) {
        let timeout = timeout.min(QUIT_TIMEOUT);
        if self.send(SmtpStep::Quit, "QUIT", timeout).await.is_ok() {
            let _ = self.read(SmtpStep::Quit, timeout).await;
        }
    }

    pub(crate) fn into_transcript(self) -> Vec<String> {
        self.transcript
    }
}
