use anyhow::Result;
use serde::Serialize;

use crate::args::Format;
use mailprobe_lib::{Category, Verdict};

#[derive(Clone, Serialize)]
pub struct OutputRow {
    pub email: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl OutputRow {
    pub fn new(email: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            email: email.into(),
            verdict,
        }
    }
}

pub fn write_reports(rows: &[OutputRow], format: Format) -> Result<()> {
    match format {
        Format::Human => write_human(rows),
        Format::Json => write_json(rows),
        Format::Ndjson => write_ndjson(rows),
    }
}

pub fn any_invalid(rows: &[OutputRow]) -> bool {
    rows.iter()
        .any(|row| row.verdict.category == Category::Invalid)
}

fn write_human(rows: &[OutputRow]) -> Result<()> {
    for row in rows {
        let v = &row.verdict;
        let tag = match v.category {
            Category::Valid => "[OK]     ",
            Category::Risky => "[RISKY]  ",
            Category::Invalid => "[INVALID]",
        };
        println!(
            "{tag} {} :: {} ({}, {}, confidence {})",
            row.email, v.reason, v.reason_code, v.decision_class, v.decision_confidence
        );
        if let Some(suggestion) = &v.suggestion {
            println!("          suggestion: {suggestion}");
        }
        if let Some(after) = v.retry_after_secs {
            println!("          retry: {} after {after}s", v.retry_strategy);
        }
        if let Some(host) = &v.evidence.mx_host {
            let step = v.evidence.step.map(|s| s.to_string()).unwrap_or_default();
            println!("          mx: {host} {step}");
        }
        if let Some(rule) = &v.matched_rule_id {
            println!(
                "          policy: {} rule {rule} (version {})",
                v.provider_profile.as_deref().unwrap_or("-"),
                v.policy_version.as_deref().unwrap_or("-")
            );
        }
        for line in &v.evidence.transcript {
            println!("          {line}");
        }
    }
    Ok(())
}

fn write_json(rows: &[OutputRow]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

fn write_ndjson(rows: &[OutputRow]) -> Result<()> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}
