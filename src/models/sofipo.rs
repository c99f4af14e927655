use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum length of an institution name (VARCHAR(200))
pub const MAX_SOFIPO_NAME_LEN: usize = 200;

/// One institution's published yield on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SofipoSnapshot {
    pub id: i64,
    #[serde(rename = "nombre")]
    #[sqlx(rename = "nombre")]
    pub name: String,
    pub gat_nominal: Option<Decimal>,
    pub gat_real: Option<Decimal>,
    #[serde(rename = "fecha_actualizacion")]
    #[sqlx(rename = "fecha_actualizacion")]
    pub observed_on: NaiveDate,
}

/// Insert payload for a SOFIPO snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct NewSofipoSnapshot {
    pub name: String,
    pub gat_nominal: Option<Decimal>,
    pub gat_real: Option<Decimal>,
    pub observed_on: NaiveDate,
}

impl NewSofipoSnapshot {
    /// A snapshot needs a name and at least one of the two GAT figures
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("SOFIPO name is required".to_string());
        }
        if name.chars().count() > MAX_SOFIPO_NAME_LEN {
            return Err(format!(
                "SOFIPO name exceeds {} characters",
                MAX_SOFIPO_NAME_LEN
            ));
        }
        if self.gat_nominal.is_none() && self.gat_real.is_none() {
            return Err(format!("SOFIPO {} has neither GAT nominal nor GAT real", name));
        }
        Ok(())
    }
}

/// Sort keys accepted by the SOFIPO listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SofipoOrder {
    #[default]
    GatNominal,
    GatReal,
    #[serde(rename = "nombre")]
    Name,
}

impl SofipoOrder {
    /// Convert from the query-string value
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "gat_nominal" => Ok(SofipoOrder::GatNominal),
            "gat_real" => Ok(SofipoOrder::GatReal),
            "nombre" => Ok(SofipoOrder::Name),
            _ => Err(format!(
                "ordenar_por must be one of gat_nominal, gat_real, nombre (got {})",
                s
            )),
        }
    }

    /// Column name; only ever one of three fixed identifiers
    pub fn column(&self) -> &'static str {
        match self {
            SofipoOrder::GatNominal => "gat_nominal",
            SofipoOrder::GatReal => "gat_real",
            SofipoOrder::Name => "nombre",
        }
    }
}

/// Pagination for the SOFIPO listing
#[derive(Debug, Clone)]
pub struct SofipoListQuery {
    pub limit: i64,
    pub offset: i64,
    pub order_by: SofipoOrder,
}
