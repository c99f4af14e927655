//! Persistent daily counter for the quota-limited quote API.

use crate::error::{CollectorError, CollectorResult};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Calls allowed per calendar day on the free tier
pub const DAILY_BUDGET: u32 = 25;

/// Source of "today" for the ledger
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct QuotaRecord {
    date: NaiveDate,
    calls: u32,
}

/// File-backed call counter keyed by calendar date.
///
/// The file is re-read on every query so separate `collect` runs on the same
/// day share one budget.
pub struct QuotaLedger {
    path: PathBuf,
    clock: Clock,
}

impl QuotaLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the calendar used to decide which day a call belongs to
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calls already spent today
    pub fn used(&self) -> u32 {
        let today = (self.clock)();
        match self.load() {
            Some(record) if record.date == today => record.calls,
            _ => 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        DAILY_BUDGET.saturating_sub(self.used())
    }

    /// Claim one call from today's budget before it is made
    pub fn reserve(&self) -> CollectorResult<()> {
        let used = self.used();
        if used >= DAILY_BUDGET {
            return Err(CollectorError::QuotaExhausted(format!(
                "daily budget of {} calls spent",
                DAILY_BUDGET
            )));
        }

        self.persist(QuotaRecord {
            date: (self.clock)(),
            calls: used + 1,
        });
        Ok(())
    }

    fn load(&self) -> Option<QuotaRecord> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Ignoring unreadable quota file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn persist(&self, record: QuotaRecord) {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create quota directory {}: {}", parent.display(), e);
                return;
            }
        }

        let result = serde_json::to_string(&record)
            .map_err(std::io::Error::from)
            .and_then(|json| fs::write(&self.path, json));
        if let Err(e) = result {
            warn!("Failed to persist quota file {}: {}", self.path.display(), e);
        }
    }
}
