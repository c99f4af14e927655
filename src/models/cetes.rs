use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Standard CETES maturities, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Maturity {
    D28,
    D91,
    D182,
    D364,
}

impl Maturity {
    pub const ALL: [Maturity; 4] = [Maturity::D28, Maturity::D91, Maturity::D182, Maturity::D364];

    /// Convert from a day count
    pub fn from_days(days: i32) -> Option<Self> {
        match days {
            28 => Some(Maturity::D28),
            91 => Some(Maturity::D91),
            182 => Some(Maturity::D182),
            364 => Some(Maturity::D364),
            _ => None,
        }
    }

    /// Day count as stored in the `plazo` column
    pub fn days(&self) -> i32 {
        match self {
            Maturity::D28 => 28,
            Maturity::D91 => 91,
            Maturity::D182 => 182,
            Maturity::D364 => 364,
        }
    }

    /// Banxico SIE series carrying the weighted auction yield for this maturity
    pub fn series_id(&self) -> &'static str {
        match self {
            Maturity::D28 => "SF43936",
            Maturity::D91 => "SF43939",
            Maturity::D182 => "SF43942",
            Maturity::D364 => "SF43945",
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} días", self.days())
    }
}

/// One recorded CETES auction yield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CetesAuction {
    pub id: i64,
    #[serde(rename = "plazo")]
    #[sqlx(rename = "plazo")]
    pub maturity_days: i32,
    #[serde(rename = "tasa")]
    #[sqlx(rename = "tasa")]
    pub rate: Decimal,
    #[serde(rename = "fecha_subasta")]
    #[sqlx(rename = "fecha_subasta")]
    pub auction_date: NaiveDate,
    #[serde(rename = "fecha_vencimiento")]
    #[sqlx(rename = "fecha_vencimiento")]
    pub maturity_date: Option<NaiveDate>,
}

/// Insert payload for a CETES observation
#[derive(Debug, Clone, PartialEq)]
pub struct NewCetesAuction {
    pub maturity: Maturity,
    pub rate: Decimal,
    pub auction_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
}

impl NewCetesAuction {
    pub fn new(maturity: Maturity, rate: Decimal, auction_date: NaiveDate) -> Self {
        Self {
            maturity,
            rate,
            auction_date,
            maturity_date: None,
        }
    }

    /// Rates are non-negative percentages
    pub fn validate(&self) -> Result<(), String> {
        if self.rate.is_sign_negative() && !self.rate.is_zero() {
            return Err(format!(
                "Negative CETES rate {} for {} on {}",
                self.rate, self.maturity, self.auction_date
            ));
        }
        Ok(())
    }
}

/// Filters for the historical CETES query
#[derive(Debug, Clone)]
pub struct CetesHistoryQuery {
    pub maturity_days: i32,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
}
