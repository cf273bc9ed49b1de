//! Divergence reports and where they go.

use crate::capture::CapturedBody;
use crate::diff::{Divergence, printable};
use bytes::Bytes;
use http::{Method, StatusCode};
use std::fmt;
use tracing::warn;

const BEFORE_RULE: &str = "before-------------------------------------------------";
const AFTER_RULE: &str = "after-------------------------------------------------";

/// A candidate body that did not match the baseline, with both bodies kept in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceReport {
    baseline: CapturedBody,
    candidate: CapturedBody,
    divergence: Divergence,
}

impl DivergenceReport {
    pub fn new(baseline: CapturedBody, candidate: CapturedBody, divergence: Divergence) -> Self {
        Self { baseline, candidate, divergence }
    }

    pub fn baseline(&self) -> &CapturedBody {
        &self.baseline
    }

    pub fn candidate(&self) -> &CapturedBody {
        &self.candidate
    }

    pub fn divergence(&self) -> &Divergence {
        &self.divergence
    }

    /// The baseline bytes.
    pub fn before(&self) -> &Bytes {
        self.baseline.bytes()
    }

    /// The candidate bytes.
    pub fn after(&self) -> &Bytes {
        self.candidate.bytes()
    }
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "request #{} diverged from baseline #{}: {}",
            self.candidate.sequence(),
            self.baseline.sequence(),
            self.divergence
        )?;
        if let Some(text_diff) = self.divergence.text_diff() {
            write!(f, "{text_diff}")?;
        }
        writeln!(f, "{BEFORE_RULE}")?;
        writeln!(f, "{}", Dump(self.before()))?;
        writeln!(f, "{AFTER_RULE}")?;
        write!(f, "{}", Dump(self.after()))
    }
}

/// Renders a body for a human: printable text as is, anything else as an escaped byte string.
#[derive(Debug, Clone, Copy)]
pub struct Dump<'a>(pub &'a [u8]);

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match printable(self.0) {
            Some(text) => f.write_str(text),
            None => write!(f, "b\"{}\"", self.0.escape_ascii()),
        }
    }
}

/// Response side details of the exchange a capture belonged to.
///
/// Used only to correlate a report with the request in the logs, the comparison
/// itself never looks at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeMeta {
    pub request_id: Option<String>,
    pub method: Option<Method>,
    pub path: Option<String>,
    pub status: Option<StatusCode>,
}

/// Receives every divergence a tap detects.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, report: &DivergenceReport, meta: &ExchangeMeta);
}

/// Writes divergence reports to the `tracing` subscriber at `WARN` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, report: &DivergenceReport, meta: &ExchangeMeta) {
        let divergence = report.divergence();
        warn!(
            baseline_seq = report.baseline().sequence(),
            candidate_seq = report.candidate().sequence(),
            baseline_len = divergence.baseline_len(),
            candidate_len = divergence.candidate_len(),
            kind = divergence.kind().as_str(),
            request_id = meta.request_id.as_deref().unwrap_or("-"),
            method = ?meta.method,
            path = meta.path.as_deref().unwrap_or("-"),
            status = ?meta.status,
            "request body diverged from baseline: {divergence}"
        );
        if let Some(text_diff) = divergence.text_diff() {
            warn!("\n{text_diff}");
        }
        warn!("\n{BEFORE_RULE}\n{}", Dump(report.before()));
        warn!("\n{AFTER_RULE}\n{}", Dump(report.after()));
    }
}
