use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::options::ProbeOptions;
use super::session::SmtpSession;
use super::util::random_local_part;
use crate::mx::MxHost;
use crate::policy::{Classification, ReplyClassifier, ReplyContext};
use crate::verdict::{Category, Confidence, DecisionClass, SmtpStep, Verdict};

/// Recipient being probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub local: String,
    pub domain: String,
    /// Provider profile name to classify replies with; empty lets the
    /// classifier infer it from the host.
    pub provider_hint: String,
}

impl ProbeTarget {
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            domain: domain.into(),
            provider_hint: String::new(),
        }
    }

    pub fn with_provider_hint(mut self, hint: impl Into<String>) -> Self {
        self.provider_hint = hint.into();
        self
    }

    pub fn address(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }
}

/// Capability to run one verification session against one exchanger.
/// Never fails: every outcome is a verdict.
#[async_trait]
pub trait SmtpProber: Send + Sync {
    async fn probe(&self, host: &MxHost, target: &ProbeTarget, cancel: &CancellationToken)
    -> Verdict;
}

type LocalPartFn = dyn Fn() -> String + Send + Sync;

/// [`SmtpProber`] speaking plain SMTP over TCP.
#[derive(Clone)]
pub struct TcpProber {
    options: ProbeOptions,
    classifier: Arc<ReplyClassifier>,
    local_parts: Arc<LocalPartFn>,
}

impl fmt::Debug for TcpProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpProber")
            .field("options", &self.options)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl TcpProber {
    pub fn new(options: ProbeOptions, classifier: Arc<ReplyClassifier>) -> Self {
        Self {
            options,
            classifier,
            local_parts: Arc::new(random_local_part),
        }
    }

    /// Replace the catch-all local part generator.
    pub fn with_local_part_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.local_parts = Arc::new(generator);
        self
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    fn probe_sender(&self, host: &str) -> Result<&str, Verdict> {
        self.options.probe_sender().ok_or_else(|| {
            Verdict::smtp_tempfail("probe_sender_missing")
                .with_step(SmtpStep::MailFrom)
                .with_host(host)
        })
    }

    /// Run the dialogue over an already connected stream, then `QUIT`.
    pub(crate) async fn run_session<S>(
        &self,
        stream: S,
        host: &str,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Verdict
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut session = SmtpSession::new(stream, host, cancel.clone());
        let verdict = match self.dialogue(&mut session, target).await {
            Ok(verdict) | Err(verdict) => verdict,
        };
        session.quit(self.options.read_timeout()).await;
        debug!(
            host,
            domain = %target.domain,
            category = %verdict.category,
            reason = %verdict.reason_code,
            "probe finished"
        );
        verdict.with_transcript(session.into_transcript())
    }

    /// `Err` carries a verdict that ended the session early.
    async fn dialogue<S>(
        &self,
        session: &mut SmtpSession<S>,
        target: &ProbeTarget,
    ) -> Result<Verdict, Verdict>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let host = session.host().to_string();
        let hint = target.provider_hint.as_str();
        let ctx = |step| ReplyContext::new(step, hint, &host);
        let read_timeout = self.options.read_timeout();
        let ehlo_timeout = self.options.ehlo_timeout();

        let banner = session.read(SmtpStep::Banner, ehlo_timeout).await?;
        proceed(self.classifier.classify(&banner, &ctx(SmtpStep::Banner)))?;

        let helo = self.options.helo_name();
        let ehlo = session
            .command(SmtpStep::Ehlo, &format!("EHLO {helo}"), ehlo_timeout)
            .await?;
        if ehlo.status_code >= 500 {
            let reply = session
                .command(SmtpStep::Helo, &format!("HELO {helo}"), ehlo_timeout)
                .await?;
            proceed(self.classifier.classify(&reply, &ctx(SmtpStep::Helo)))?;
        } else {
            proceed(self.classifier.classify(&ehlo, &ctx(SmtpStep::Ehlo)))?;
        }

        let sender = self.probe_sender(&host)?;
        let reply = session
            .command(
                SmtpStep::MailFrom,
                &format!("MAIL FROM:<{sender}>"),
                read_timeout,
            )
            .await?;
        if reply.status_code >= 500 {
            return Err(self
                .classifier
                .classify_mail_from_rejection(&reply, &ctx(SmtpStep::MailFrom)));
        }
        proceed(self.classifier.classify(&reply, &ctx(SmtpStep::MailFrom)))?;

        let reply = session
            .command(
                SmtpStep::RcptTo,
                &format!("RCPT TO:<{}>", target.address()),
                read_timeout,
            )
            .await?;
        let primary = self.classifier.verdict(&reply, &ctx(SmtpStep::RcptTo));
        if !primary.is_valid() || !self.options.catch_all_detection {
            return Ok(primary);
        }

        let decoy = format!("{}@{}", (self.local_parts)(), target.domain);
        let reply = session
            .command(SmtpStep::RcptTo, &format!("RCPT TO:<{decoy}>"), read_timeout)
            .await?;
        if reply.is_positive_completion() {
            debug!(host = %host, domain = %target.domain, "domain accepts any recipient");
            let catch_all = Verdict::new(
                Category::Risky,
                "catch_all",
                DecisionClass::Deliverable,
                Confidence::High,
            )
            .with_reply(&reply)
            .with_step(SmtpStep::RcptTo)
            .with_host(host.as_str());
            return Ok(match primary.provider_profile.clone() {
                Some(profile) => {
                    catch_all.with_provenance(profile, primary.policy_version.clone(), None)
                }
                None => catch_all,
            });
        }

        // Any permanent refusal of the decoy confirms the real recipient.
        if reply.is_permanent_failure() {
            return Ok(primary.with_confidence(Confidence::High));
        }
        Ok(self.classifier.verdict(&reply, &ctx(SmtpStep::RcptTo)))
    }
}

fn proceed(classification: Classification) -> Result<(), Verdict> {
    match classification {
        Classification::Continue => Ok(()),
        Classification::Done(verdict) => Err(verdict),
    }
}

#[async_trait]
impl SmtpProber for TcpProber {
    async fn probe(
        &self,
        host: &MxHost,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Verdict {
        if let Err(verdict) = self.probe_sender(&host.host) {
            return verdict;
        }

        let connect = tokio::time::timeout(
            self.options.connect_timeout(),
            TcpStream::connect((host.host.as_str(), self.options.port)),
        );
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Verdict::smtp_timeout()
                    .with_step(SmtpStep::Connect)
                    .with_host(host.host.as_str());
            }
            res = connect => res,
        };

        let stream = match connected {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                debug!(host = %host.host, error = %err, "connect failed");
                return connect_failed(&host.host);
            }
            Err(_elapsed) => {
                debug!(host = %host.host, "connect timed out");
                return connect_failed(&host.host);
            }
        };

        self.run_session(stream, &host.host, target, cancel).await
    }
}

fn connect_failed(host: &str) -> Verdict {
    Verdict::risky("smtp_connect_timeout")
        .with_decision(DecisionClass::Retryable)
        .with_step(SmtpStep::Connect)
        .with_host(host)
}
