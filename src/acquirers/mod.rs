//! Ingestion side: one acquirer per upstream source.
//!
//! Each acquirer fetches, parses and persists through its store trait and
//! reports how many rows it materialised.

pub mod cetes;
pub mod etfs;
pub mod quota;
pub mod sofipos;

pub use cetes::{CetesAcquirer, DEFAULT_DAYS_BACK};
pub use etfs::{EtfAcquirer, WatchlistEntry, WATCHLIST};
pub use quota::{Clock, QuotaLedger, DAILY_BUDGET};
pub use sofipos::{SofipoAcquirer, SofipoCollection, SofipoRow, SofipoSource};
