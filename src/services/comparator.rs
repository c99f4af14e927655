use crate::error::AppResult;
use crate::models::{CetesAuction, EtfQuote, SofipoSnapshot};
use crate::repositories::{CetesStore, FondoStore, SofipoStore};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// How many rows per category feed the comparison
pub const TOP_PER_CATEGORY: i64 = 5;

pub const RISK_NOTE: &str = "CETES y SOFIPOs son inversiones de bajo riesgo. ETFs tienen mayor riesgo pero potencialmente mayor rendimiento.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CetesEntry {
    pub plazo: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub tasa: Decimal,
    pub fecha: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SofipoEntry {
    pub nombre: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub gat_nominal: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub gat_real: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FondoEntry {
    pub ticker: String,
    pub nombre: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub precio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub rendimiento_ytd: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestCete {
    pub plazo: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub tasa: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSofipo {
    pub nombre: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub gat_nominal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestFondo {
    pub ticker: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub rendimiento_ytd: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub mejor_cete: Option<BestCete>,
    pub mejor_sofipo: Option<BestSofipo>,
    pub mejor_fondo: Option<BestFondo>,
    pub nota: &'static str,
}

/// Cross-category snapshot served by `/api/comparar`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub cetes: Vec<CetesEntry>,
    pub sofipos_top: Vec<SofipoEntry>,
    pub fondos_top: Vec<FondoEntry>,
    pub resumen: Summary,
}

/// Picks the best instrument in each category
pub struct Comparator {
    cetes: Arc<dyn CetesStore>,
    sofipos: Arc<dyn SofipoStore>,
    fondos: Arc<dyn FondoStore>,
}

impl Comparator {
    pub fn new(
        cetes: Arc<dyn CetesStore>,
        sofipos: Arc<dyn SofipoStore>,
        fondos: Arc<dyn FondoStore>,
    ) -> Self {
        Self {
            cetes,
            sofipos,
            fondos,
        }
    }

    /// Read all three categories concurrently and rank them
    pub async fn compare(&self) -> AppResult<Comparison> {
        let (cetes, sofipos, fondos) = tokio::try_join!(
            self.cetes.latest_per_maturity(),
            self.sofipos.top(TOP_PER_CATEGORY),
            self.fondos.top_by_ytd(TOP_PER_CATEGORY),
        )?;

        debug!(
            "Comparing {} CETES, {} SOFIPOs, {} funds",
            cetes.len(),
            sofipos.len(),
            fondos.len()
        );
        Ok(summarize(&cetes, &sofipos, &fondos))
    }
}

/// Assemble the comparison from already-ranked rows
pub fn summarize(cetes: &[CetesAuction], sofipos: &[SofipoSnapshot], fondos: &[EtfQuote]) -> Comparison {
    // Ties go to the longer maturity
    let mejor_cete = cetes
        .iter()
        .max_by(|a, b| {
            a.rate
                .cmp(&b.rate)
                .then(a.maturity_days.cmp(&b.maturity_days))
        })
        .map(|c| BestCete {
            plazo: c.maturity_days,
            tasa: c.rate,
        });

    let mejor_sofipo = sofipos.iter().find_map(|s| {
        s.gat_nominal.map(|gat_nominal| BestSofipo {
            nombre: s.name.clone(),
            gat_nominal,
        })
    });

    let mejor_fondo = fondos.first().map(|f| BestFondo {
        ticker: f.ticker.clone(),
        rendimiento_ytd: f.ytd_return,
    });

    Comparison {
        cetes: cetes
            .iter()
            .map(|c| CetesEntry {
                plazo: c.maturity_days,
                tasa: c.rate,
                fecha: c.auction_date,
            })
            .collect(),
        sofipos_top: sofipos
            .iter()
            .map(|s| SofipoEntry {
                nombre: s.name.clone(),
                gat_nominal: s.gat_nominal,
                gat_real: s.gat_real,
            })
            .collect(),
        fondos_top: fondos
            .iter()
            .map(|f| FondoEntry {
                ticker: f.ticker.clone(),
                nombre: f.name.clone(),
                precio: f.current_price,
                rendimiento_ytd: f.ytd_return,
            })
            .collect(),
        resumen: Summary {
            mejor_cete,
            mejor_sofipo,
            mejor_fondo,
            nota: RISK_NOTE,
        },
    }
}
