use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// format de sortie
    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,

    /// configuration JSON (pipeline, fournisseurs, politique)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// vérifications simultanées en mode lot
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// enveloppe MAIL FROM (remplace la configuration)
    #[arg(long = "mail-from")]
    pub mail_from: Option<String>,

    /// nom annoncé en EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// désactive la détection de catch-all
    #[arg(long = "no-catch-all")]
    pub no_catch_all: bool,

    /// augmente la verbosité des logs (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// vérifie une adresse
    Verify { email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
    Ndjson,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    /// Directive par défaut du filtre de logs, écrasée par `RUST_LOG`.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
