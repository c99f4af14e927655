//! Domain models for the rates backend.
//!
//! One module per instrument category, each backed by its own table.

pub mod cetes;
pub mod fondo;
pub mod sofipo;

// Re-export all models for convenient access
pub use cetes::{CetesAuction, CetesHistoryQuery, Maturity, NewCetesAuction};
pub use fondo::{EtfQuote, FondoListQuery, FundKind, Market, NewEtfQuote};
pub use sofipo::{NewSofipoSnapshot, SofipoListQuery, SofipoOrder, SofipoSnapshot};
