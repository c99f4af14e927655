use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum ticker length (VARCHAR(20))
pub const MAX_TICKER_LEN: usize = 20;

/// Fund vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundKind {
    Etf,
    MutualFund,
    IndexFund,
}

impl FundKind {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "ETF" => Ok(FundKind::Etf),
            "MUTUAL_FUND" => Ok(FundKind::MutualFund),
            "INDEX_FUND" => Ok(FundKind::IndexFund),
            _ => Err(format!("Invalid fund type: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            FundKind::Etf => "ETF",
            FundKind::MutualFund => "MUTUAL_FUND",
            FundKind::IndexFund => "INDEX_FUND",
        }
    }
}

/// Market a fund is listed in or tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    Us,
    Mx,
    Eu,
    Global,
}

impl Market {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "US" => Ok(Market::Us),
            "MX" => Ok(Market::Mx),
            "EU" => Ok(Market::Eu),
            "GLOBAL" => Ok(Market::Global),
            _ => Err(format!("Invalid market: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Mx => "MX",
            Market::Eu => "EU",
            Market::Global => "GLOBAL",
        }
    }
}

/// One ETF price observation on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EtfQuote {
    pub id: i64,
    pub ticker: String,
    #[serde(rename = "nombre")]
    #[sqlx(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "tipo")]
    #[sqlx(rename = "tipo")]
    pub kind: Option<String>, // Stored as TEXT, use FundKind for type safety
    #[serde(rename = "mercado")]
    #[sqlx(rename = "mercado")]
    pub market: Option<String>, // Stored as TEXT, use Market for type safety
    #[serde(rename = "precio_actual")]
    #[sqlx(rename = "precio_actual")]
    pub current_price: Option<Decimal>,
    #[serde(rename = "rendimiento_anual")]
    #[sqlx(rename = "rendimiento_anual")]
    pub annual_return: Option<Decimal>,
    #[serde(rename = "rendimiento_ytd")]
    #[sqlx(rename = "rendimiento_ytd")]
    pub ytd_return: Option<Decimal>,
    #[serde(rename = "fecha_actualizacion")]
    #[sqlx(rename = "fecha_actualizacion")]
    pub observed_on: NaiveDate,
}

/// Upsert payload for an ETF quote
#[derive(Debug, Clone, PartialEq)]
pub struct NewEtfQuote {
    pub ticker: String,
    pub name: Option<String>,
    pub kind: Option<FundKind>,
    pub market: Option<Market>,
    pub current_price: Option<Decimal>,
    pub annual_return: Option<Decimal>,
    pub ytd_return: Option<Decimal>,
    pub observed_on: NaiveDate,
}

impl NewEtfQuote {
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.is_empty() {
            return Err("Ticker is required".to_string());
        }
        if self.ticker.len() > MAX_TICKER_LEN {
            return Err(format!("Ticker {} exceeds {} characters", self.ticker, MAX_TICKER_LEN));
        }
        if self.ticker != self.ticker.to_uppercase() {
            return Err(format!("Ticker {} must be uppercase", self.ticker));
        }
        Ok(())
    }
}

/// Filters for the fund listing
#[derive(Debug, Clone, Default)]
pub struct FondoListQuery {
    pub kind: Option<String>,
    pub market: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
