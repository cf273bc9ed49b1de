//! Byte level comparison of two request bodies.
//!
//! Bodies are treated as opaque byte strings: a multipart upload is compared the
//! same way as any other payload. When both sides happen to be printable text a
//! line oriented diff is attached to make the divergence easier to read.

use std::fmt;
use std::fmt::Write as _;

/// Outcome of comparing a candidate body against a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
    Equal,
    Divergent(Divergence),
}

impl DiffResult {
    #[inline]
    pub fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }

    pub fn divergence(&self) -> Option<&Divergence> {
        match self {
            Self::Equal => None,
            Self::Divergent(divergence) => Some(divergence),
        }
    }
}

/// How a candidate body differs from the baseline.
///
/// Offsets are zero based and point at the first byte where the two bodies disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceKind {
    /// The candidate is empty while the baseline is not.
    Emptied,
    /// The candidate is a strict prefix of the baseline.
    Truncated { offset: usize },
    /// The baseline is a strict prefix of the candidate.
    Extended { offset: usize },
    /// Same length and same bytes, in a different order.
    Reordered { offset: usize },
    /// Same length, different content.
    Changed { offset: usize },
    /// Different length and different content before either side ends.
    Resized { offset: usize },
}

impl DivergenceKind {
    pub fn first_offset(&self) -> Option<usize> {
        match *self {
            Self::Emptied => None,
            Self::Truncated { offset }
            | Self::Extended { offset }
            | Self::Reordered { offset }
            | Self::Changed { offset }
            | Self::Resized { offset } => Some(offset),
        }
    }

    pub fn is_length_mismatch(&self) -> bool {
        matches!(self, Self::Emptied | Self::Truncated { .. } | Self::Extended { .. } | Self::Resized { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emptied => "emptied",
            Self::Truncated { .. } => "truncated",
            Self::Extended { .. } => "extended",
            Self::Reordered { .. } => "reordered",
            Self::Changed { .. } => "changed",
            Self::Resized { .. } => "resized",
        }
    }
}

/// A detected difference between two bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    kind: DivergenceKind,
    baseline_len: usize,
    candidate_len: usize,
    // (baseline, candidate) at the first differing offset, when both sides have one
    first_bytes: Option<(u8, u8)>,
    text_diff: Option<String>,
}

impl Divergence {
    #[inline]
    pub fn kind(&self) -> DivergenceKind {
        self.kind
    }

    #[inline]
    pub fn baseline_len(&self) -> usize {
        self.baseline_len
    }

    #[inline]
    pub fn candidate_len(&self) -> usize {
        self.candidate_len
    }

    /// Baseline and candidate byte at the first differing offset.
    pub fn first_bytes(&self) -> Option<(u8, u8)> {
        self.first_bytes
    }

    /// Line diff, present only when both bodies are printable UTF-8.
    pub fn text_diff(&self) -> Option<&str> {
        self.text_diff.as_deref()
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (baseline_len, candidate_len) = (self.baseline_len, self.candidate_len);
        match self.kind {
            DivergenceKind::Emptied => {
                write!(f, "length mismatch: candidate is empty, baseline has {baseline_len} bytes")
            }
            DivergenceKind::Truncated { .. } => {
                write!(f, "length mismatch: candidate truncated to {candidate_len} of {baseline_len} baseline bytes")
            }
            DivergenceKind::Extended { .. } => {
                write!(f, "length mismatch: candidate extends the {baseline_len} baseline bytes to {candidate_len}")
            }
            DivergenceKind::Reordered { offset } => {
                write!(f, "content reordered: same {baseline_len} bytes in a different order from byte offset {offset}")?;
                self.fmt_first_bytes(f)
            }
            DivergenceKind::Changed { offset } => {
                write!(f, "content mismatch at byte offset {offset}, length {baseline_len} unchanged")?;
                self.fmt_first_bytes(f)
            }
            DivergenceKind::Resized { offset } => {
                write!(
                    f,
                    "length mismatch: baseline {baseline_len} bytes, candidate {candidate_len} bytes, content differs from byte offset {offset}"
                )?;
                self.fmt_first_bytes(f)
            }
        }
    }
}

impl Divergence {
    fn fmt_first_bytes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_bytes {
            Some((baseline, candidate)) => write!(
                f,
                " (baseline {baseline:#04x} '{}', candidate {candidate:#04x} '{}')",
                baseline.escape_ascii(),
                candidate.escape_ascii()
            ),
            None => Ok(()),
        }
    }
}

/// Compares `candidate` against `baseline` byte for byte.
pub fn diff(baseline: &[u8], candidate: &[u8]) -> DiffResult {
    if baseline == candidate {
        return DiffResult::Equal;
    }

    let offset = first_mismatch(baseline, candidate);
    let kind = if candidate.is_empty() {
        DivergenceKind::Emptied
    } else if offset == candidate.len() {
        DivergenceKind::Truncated { offset }
    } else if offset == baseline.len() {
        DivergenceKind::Extended { offset }
    } else if baseline.len() != candidate.len() {
        DivergenceKind::Resized { offset }
    } else if same_bytes(baseline, candidate) {
        DivergenceKind::Reordered { offset }
    } else {
        DivergenceKind::Changed { offset }
    };

    let first_bytes = baseline.get(offset).copied().zip(candidate.get(offset).copied());
    let text_diff = match (printable(baseline), printable(candidate)) {
        (Some(before), Some(after)) => Some(text_diff(before, after)),
        _ => None,
    };

    DiffResult::Divergent(Divergence {
        kind,
        baseline_len: baseline.len(),
        candidate_len: candidate.len(),
        first_bytes,
        text_diff,
    })
}

fn first_mismatch(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).position(|(x, y)| x != y).unwrap_or_else(|| a.len().min(b.len()))
}

// same multiset of byte values
fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    let mut counts = [0_i64; 256];
    for &x in a {
        counts[usize::from(x)] += 1;
    }
    for &y in b {
        counts[usize::from(y)] -= 1;
    }
    counts.iter().all(|&c| c == 0)
}

pub(crate) fn printable(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok().filter(|s| s.chars().all(|c| !c.is_control() || matches!(c, '\r' | '\n' | '\t')))
}

/// Renders the lines that differ once the common leading and trailing lines are removed.
fn text_diff(before: &str, after: &str) -> String {
    let before: Vec<&str> = before.lines().collect();
    let after: Vec<&str> = after.lines().collect();

    let prefix = before.iter().zip(&after).take_while(|(x, y)| x == y).count();
    let max_suffix = before.len().min(after.len()) - prefix;
    let suffix = before.iter().rev().zip(after.iter().rev()).take(max_suffix).take_while(|(x, y)| x == y).count();

    let mut out = String::new();
    let _ = writeln!(out, "@@ line {} @@", prefix + 1);
    for line in &before[prefix..before.len() - suffix] {
        let _ = writeln!(out, "-{line}");
    }
    for line in &after[prefix..after.len() - suffix] {
        let _ = writeln!(out, "+{line}");
    }
    out
}
