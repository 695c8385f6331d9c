mod args;
mod output;

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};
use mailprobe_lib::{ProviderAwareVerifier, VerifierConfig};
use output::OutputRow;

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<VerifierConfig> {
    let mut config = match &cli.config {
        Some(path) => VerifierConfig::from_path(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => VerifierConfig::default(),
    };
    let probe = &mut config.pipeline.probe;
    if let Some(from) = &cli.mail_from {
        probe.mail_from = from.clone();
    }
    if let Some(helo) = &cli.helo {
        probe.helo_domain = helo.clone();
    }
    if cli.no_catch_all {
        probe.catch_all_detection = false;
    }
    Ok(config)
}

fn read_stdin() -> Result<Vec<String>> {
    let mut emails = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("read stdin")?;
        let email = line.trim();
        if !email.is_empty() {
            emails.push(email.to_string());
        }
    }
    Ok(emails)
}

/// Verifies `emails` with at most `concurrency` in flight; rows keep input
/// order.
async fn verify_all(
    verifier: Arc<ProviderAwareVerifier>,
    emails: Vec<String>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<OutputRow>> {
    let limit = concurrency.max(1);
    let mut results = vec![None; emails.len()];
    let mut tasks = JoinSet::new();
    let mut pending = emails.into_iter().enumerate();

    loop {
        while tasks.len() < limit {
            let Some((idx, email)) = pending.next() else {
                break;
            };
            let verifier = Arc::clone(&verifier);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let verdict = verifier.verify(&email, &cancel).await;
                (idx, OutputRow::new(email, verdict))
            });
        }
        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (idx, row) = joined.context("verification task failed")?;
        results[idx] = Some(row);
    }

    Ok(results.into_iter().flatten().collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let emails = if cli.stdin {
        read_stdin()?
    } else if let Some(Commands::Verify { email }) = &cli.cmd {
        vec![email.clone()]
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    };
    if emails.is_empty() {
        bail!("no address to verify");
    }

    let config = load_config(&cli)?;
    if config.pipeline.probe.mail_from.trim().is_empty() {
        warn!("no MAIL FROM configured; probes will report probe_sender_missing (use --mail-from)");
    }
    let verifier = ProviderAwareVerifier::from_config(&config)
        .context("initialise verifier")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted; cancelling in-flight verifications");
            on_signal.cancel();
        }
    });

    let rows = verify_all(Arc::new(verifier), emails, cli.concurrency, &cancel).await?;
    output::write_reports(&rows, cli.format)?;

    // codes de sortie : 0 OK, 2 invalids, 1 fatal
    if output::any_invalid(&rows) {
        std::process::exit(2);
    }
    Ok(())
}
