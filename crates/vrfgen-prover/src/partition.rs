//! Splitting a nonce range across workers

use serde::{Deserialize, Serialize};

use crate::error::{ProverError, Result};

/// Inclusive range of nonces `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonceRange {
    pub start: u64,
    pub end: u64,
}

impl NonceRange {
    /// Build a range, rejecting empty ones and nonce zero
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start == 0 || start > end {
            return Err(ProverError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Nonces `1..=count`
    pub fn first(count: u64) -> Result<Self> {
        Self::new(1, count)
    }

    /// Number of nonces in the range
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// True only for a hand-built range with `start > end`; ranges from
    /// [`NonceRange::new`] always hold at least one nonce.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, nonce: u64) -> bool {
        self.start <= nonce && nonce <= self.end
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }
}

/// Split `[start, end]` into contiguous, non-overlapping sub-ranges, one per
/// worker where possible.
///
/// Each range except the last spans `(end - start) / workers + 1` nonces; the
/// last is clamped to `end`. Fewer than `workers` ranges come back when the
/// range is too short to give every worker a nonce. A worker count whose
/// ranges cannot be allocated is rejected as invalid.
pub fn partition(start: u64, end: u64, workers: usize) -> Result<Vec<NonceRange>> {
    if workers == 0 {
        return Err(ProverError::InvalidWorkerCount(workers));
    }
    let whole = NonceRange::new(start, end)?;

    let span = (whole.end - whole.start) / workers as u64 + 1;
    let count = (whole.end - whole.start) / span + 1;
    let mut ranges: Vec<NonceRange> = Vec::new();
    usize::try_from(count)
        .ok()
        .and_then(|count| ranges.try_reserve_exact(count).ok())
        .ok_or(ProverError::InvalidWorkerCount(workers))?;
    let mut lo = whole.start;
    loop {
        let hi = lo.saturating_add(span - 1).min(whole.end);
        ranges.push(NonceRange { start: lo, end: hi });
        match hi.checked_add(1) {
            Some(next) if next <= whole.end => lo = next,
            _ => break,
        }
    }
    Ok(ranges)
}
