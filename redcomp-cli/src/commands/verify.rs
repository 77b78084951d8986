//! Verify a model's contracts through the solver

use crate::config::Config;
use crate::signal::cancel_on_interrupt;
use anyhow::{Context, Result};
use colored::*;
use redcomp_core::ComponentModel;
use redcomp_solver::{
    CancellationToken, GroupOutcome, GroupStatus, JobReport, PropertyGroup, Solver,
    VerificationJob, Verdict,
};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Which groups a verification run submits
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Components to diagnose, each in its own group after the system check
    pub targets: Vec<String>,

    /// Skip the system contract group
    pub diagnose_only: bool,
}

/// Groups to run for `model`, system contract first
pub fn property_groups(model: &ComponentModel, options: &VerifyOptions) -> Result<Vec<PropertyGroup>> {
    let mut groups = Vec::new();
    if !options.diagnose_only {
        groups.push(PropertyGroup::from_model(model, None)?);
    }
    for target in &options.targets {
        groups.push(
            PropertyGroup::from_model(model, Some(target))
                .with_context(|| format!("Cannot diagnose component {}", target))?,
        );
    }
    Ok(groups)
}

/// Run the verification job; returns whether every property was proved valid
pub fn verify(model: &Path, options: VerifyOptions, config: &Config) -> Result<bool> {
    let start = Instant::now();
    let loaded = ComponentModel::from_path(model)
        .with_context(|| format!("Cannot load model {}", model.display()))?;
    let groups = property_groups(&loaded, &options)?;
    if groups.is_empty() {
        println!("{} Nothing to verify", "!".yellow());
        return Ok(true);
    }

    println!("{} Verifying {}", "→".blue().bold(), model.display());
    let solver = Solver::new(config.solver_config()?);
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone())?;
    let job = VerificationJob::start(solver, config.job.queue_capacity, cancel.clone())?;
    for group in groups {
        job.submit(group)?;
    }
    let report = job.finish()?;
    info!(groups = report.outcomes.len(), "verification job finished");

    if cancel.is_cancelled() {
        println!("{} Interrupted", "!".yellow());
    }
    print!("{}", render_report(&report));
    println!("\n{}", "─".repeat(60));
    let proved = all_valid(&report);
    let summary = format!("Finished in {:.2}s", start.elapsed().as_secs_f64());
    if proved {
        println!("{} {}", "✓".green(), summary);
    } else {
        println!("{} {}", "✗".red(), summary);
    }
    Ok(proved)
}

fn all_valid(report: &JobReport) -> bool {
    report.is_success()
        && report.outcomes.iter().all(|outcome| {
            outcome
                .result
                .properties()
                .all(|(_, result)| matches!(result, Some(r) if r.verdict == Verdict::Valid))
        })
}

/// Human-readable report of every group
pub fn render_report(report: &JobReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        render_outcome(&mut out, outcome);
    }
    out
}

fn render_outcome(out: &mut String, outcome: &GroupOutcome) {
    let status = match &outcome.status {
        GroupStatus::Completed => "completed".green().to_string(),
        GroupStatus::Cancelled => "cancelled".yellow().to_string(),
        GroupStatus::Failed(_) => "failed".red().to_string(),
    };
    let _ = writeln!(out, "\n{} [{}]", outcome.name.bold(), status);
    if let GroupStatus::Failed(message) = &outcome.status {
        for line in message.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        return;
    }

    let result = &outcome.result;
    if let Some(text) = &result.strongest_property {
        let _ = writeln!(out, "  Strongest system property:");
        indent(out, text);
    }
    if let Some(text) = &result.weakest_property {
        let _ = writeln!(out, "  Weakest component property:");
        indent(out, text);
    }

    for (info, property) in result.properties() {
        let Some(property) = property else {
            let _ = writeln!(out, "  {} {}", "-".dimmed(), info.display);
            continue;
        };
        let verdict = match property.verdict {
            Verdict::Valid => property.verdict.as_str().green(),
            Verdict::Falsifiable => property.verdict.as_str().red(),
            Verdict::Unknown => property.verdict.as_str().yellow(),
        };
        let _ = writeln!(
            out,
            "  {} {} ({:.3}s)",
            verdict, info.display, property.runtime
        );
        if let Some(cex) = &property.counterexample {
            for signal in cex.signals.values() {
                let values: Vec<String> = (0..cex.length())
                    .map(|time| signal.value(time).unwrap_or("-").to_string())
                    .collect();
                let _ = writeln!(out, "      {} = {}", signal.name, values.join(", "));
            }
        }
    }
}

fn indent(out: &mut String, text: &str) {
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(out, "    {}", line);
    }
}
