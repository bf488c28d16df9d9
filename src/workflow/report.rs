use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::workflow::types::{
    AcceptanceOutcome, AcceptanceStatus, CloneOutcome, RunLedger, WorkflowReport,
};

/// Aggregate everything recorded in `ledger` into the report shape.
///
/// Works on partial ledgers. Counts are clamped so that
/// `cloned <= accepted <= valid_invitations <= emails_checked` holds even if
/// a stage recorded more than its predecessor fed it.
pub fn synthesize(ledger: &RunLedger) -> WorkflowReport {
    synthesize_at(ledger, Utc::now())
}

fn synthesize_at(ledger: &RunLedger, now: DateTime<Utc>) -> WorkflowReport {
    let emails_checked = count(ledger.items_checked).max(count(ledger.candidates.len()));
    let valid_invitations = count(ledger.candidates.len());
    let accepted = count(ledger.acceptances.iter().filter(|a| a.accepted).count());
    let cloned = count(ledger.clones.iter().filter(|c| c.success).count());

    let accepted = accepted.min(valid_invitations);
    let cloned = cloned.min(accepted);

    let mut errors = ledger.errors.clone();
    errors.extend(
        ledger
            .acceptances
            .iter()
            .filter(|a| a.status == AcceptanceStatus::Error)
            .map(|a| format!("{}: {}", a.repo_full_name, a.message)),
    );
    errors.extend(
        ledger
            .clones
            .iter()
            .filter(|c| c.status.is_error())
            .map(|c| format!("{}: {}", c.repo_url, c.message)),
    );

    WorkflowReport {
        emails_checked,
        valid_invitations,
        accepted,
        cloned,
        errors,
        repositories: repository_records(&ledger.acceptances, &ledger.clones),
        timestamp: now.to_rfc3339(),
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// One flat record per acceptance, joined with its clone attempt by URL.
fn repository_records(
    acceptances: &[AcceptanceOutcome],
    clones: &[CloneOutcome],
) -> Vec<BTreeMap<String, String>> {
    acceptances
        .iter()
        .map(|acceptance| {
            let mut record = BTreeMap::new();
            record.insert("repository".to_string(), acceptance.repo_full_name.clone());
            record.insert("repo_url".to_string(), acceptance.repo_url.clone());
            record.insert(
                "acceptance_status".to_string(),
                acceptance.status.as_str().to_string(),
            );

            let clone = acceptance
                .accepted
                .then(|| clones.iter().find(|c| c.repo_url == acceptance.repo_url))
                .flatten();
            if let Some(clone) = clone {
                record.insert("clone_status".to_string(), clone.status.as_str().to_string());
                if let Some(path) = &clone.local_path {
                    record.insert("local_path".to_string(), path.display().to_string());
                }
                if let Some(head) = &clone.head {
                    record.insert("head".to_string(), head.to_string());
                }
            }
            record
        })
        .collect()
}

/// Write `report` as pretty JSON to `<dir>/workflow_report_<stamp>.json`.
pub fn persist(report: &WorkflowReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::Report(format!("Failed to create {}: {e}", dir.display())))?;

    let path = dir.join(file_name(Utc::now()));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .map_err(|e| AppError::Report(format!("Failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "Report saved");
    Ok(path)
}

fn file_name(now: DateTime<Utc>) -> String {
    format!("workflow_report_{}.json", now.format("%Y%m%d_%H%M%S"))
}
