// src/engine/report.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::PipelineStatus;

/// On-disk record of one pipeline run, refreshed on every stage transition.
///
/// This is the query surface for a running or finished session: current
/// stage, per-member states within it and, on failure, which members failed
/// and why.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: PipelineStatus,
}

impl SessionReport {
    pub fn new(status: PipelineStatus) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            status,
        }
    }
}

/// Serialize the report to `path` as pretty-printed JSON.
pub fn write_session_report(path: &Path, report: &SessionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serializing session report")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("writing session report to {}", path.display()))
}
