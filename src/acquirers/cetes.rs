//! CETES auction rates from the Banxico SIE time-series API.

use crate::config::SourcesConfig;
use crate::decimal::try_parse_decimal;
use crate::error::{CollectorError, CollectorResult};
use crate::models::{Maturity, NewCetesAuction};
use crate::repositories::CetesStore;
use chrono::{Datelike, Days, Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Look-back window used when the caller has no preference
pub const DEFAULT_DAYS_BACK: u32 = 30;

const SOURCE_NAME: &str = "banxico";

const SIE_DATE_LEN: usize = 10;
const MIN_SIE_YEAR: i32 = 1900;

// Response envelope: {"bmx": {"series": [{"idSerie": "...", "datos": [{"fecha", "dato"}]}]}}
#[derive(Debug, Deserialize, Default)]
struct SieResponse {
    #[serde(default)]
    bmx: Option<SieBody>,
}

#[derive(Debug, Deserialize, Default)]
struct SieBody {
    #[serde(default)]
    series: Vec<SieSeries>,
}

#[derive(Debug, Deserialize)]
struct SieSeries {
    #[serde(rename = "idSerie", default)]
    id: Option<String>,
    #[serde(default)]
    datos: Vec<SiePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SiePoint {
    #[serde(default)]
    fecha: Option<String>,
    #[serde(default)]
    dato: Option<String>,
}

/// Pulls the four CETES series and stores each auction once
pub struct CetesAcquirer {
    client: Client,
    base_url: String,
    store: Arc<dyn CetesStore>,
}

impl CetesAcquirer {
    pub fn new(config: &SourcesConfig, store: Arc<dyn CetesStore>) -> CollectorResult<Self> {
        let api_key = config
            .banxico_api_key
            .as_deref()
            .ok_or_else(|| CollectorError::Config("BANXICO_API_KEY is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(api_key)
            .map_err(|_| CollectorError::Config("BANXICO_API_KEY is not a valid header value".to_string()))?;
        headers.insert("Bmx-Token", token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.banxico_base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub async fn collect_default(&self) -> CollectorResult<usize> {
        self.collect(DEFAULT_DAYS_BACK).await
    }

    /// Fetch every maturity for the last `days_back` days; returns rows newly stored.
    ///
    /// A failed series counts as zero and the remaining maturities still run.
    pub async fn collect(&self, days_back: u32) -> CollectorResult<usize> {
        info!("Collecting CETES for the last {} days", days_back);

        let to = Local::now().date_naive();
        let from = to
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);

        let mut total = 0;
        for maturity in Maturity::ALL {
            let points = match self.fetch_series(maturity, from, to).await {
                Ok(points) => points,
                Err(e) => {
                    error!("Failed to fetch CETES {}: {}", maturity, e);
                    continue;
                }
            };

            let auctions = parse_points(maturity, &points);
            let outcome = self.store.upsert_batch(&auctions).await?;
            info!(
                "CETES {}: {} fetched, {} new, {} already stored, {} rejected",
                maturity,
                points.len(),
                outcome.inserted,
                outcome.unchanged,
                outcome.failed
            );
            total += outcome.inserted;
        }

        info!("CETES collection finished: {} new rows", total);
        Ok(total)
    }

    async fn fetch_series(
        &self,
        maturity: Maturity,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CollectorResult<Vec<SiePoint>> {
        let url = format!(
            "{}/series/{}/datos/{}/{}",
            self.base_url,
            maturity.series_id(),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        debug!("Requesting {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CollectorError::UnexpectedStatus {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }

        let body: SieResponse = response.json().await?;
        let series = body
            .bmx
            .unwrap_or_default()
            .series
            .into_iter()
            .next();

        match series {
            Some(series) => {
                if let Some(id) = series.id.as_deref().filter(|id| *id != maturity.series_id()) {
                    warn!("Asked for {} but Banxico answered {}", maturity.series_id(), id);
                }
                Ok(series.datos)
            }
            None => {
                warn!("No data for series {}", maturity.series_id());
                Ok(Vec::new())
            }
        }
    }
}

/// Banxico dates are always `dd/mm/yyyy`; chrono alone would also take `3/10/24`
fn parse_sie_date(fecha: &str) -> CollectorResult<NaiveDate> {
    let fecha = fecha.trim();
    let date = (fecha.len() == SIE_DATE_LEN)
        .then(|| NaiveDate::parse_from_str(fecha, "%d/%m/%Y").ok())
        .flatten()
        .filter(|date| date.year() >= MIN_SIE_YEAR);

    date.ok_or_else(|| CollectorError::Parse(format!("invalid SIE date '{}'", fecha)))
}

/// Turn raw SIE points into auctions, dropping "N/E" and malformed entries
pub(crate) fn parse_points(maturity: Maturity, points: &[SiePoint]) -> Vec<NewCetesAuction> {
    points
        .iter()
        .filter_map(|point| {
            let (Some(fecha), Some(dato)) = (point.fecha.as_deref(), point.dato.as_deref()) else {
                warn!("Skipping CETES {} point with a missing field: {:?}", maturity, point);
                return None;
            };

            let auction_date = match parse_sie_date(fecha) {
                Ok(date) => date,
                Err(e) => {
                    warn!("Skipping CETES {} point: {}", maturity, e);
                    return None;
                }
            };

            match try_parse_decimal(dato) {
                Ok(Some(rate)) => Some(NewCetesAuction::new(maturity, rate, auction_date)),
                Ok(None) => {
                    debug!("No CETES {} rate published for {}", maturity, auction_date);
                    None
                }
                Err(e) => {
                    warn!("Skipping CETES {} point for {}: {}", maturity, auction_date, e);
                    None
                }
            }
        })
        .collect()
}
