//! ETF quotes from the Alpha Vantage GLOBAL_QUOTE endpoint.
//!
//! The free tier allows [`DAILY_BUDGET`] calls a day, so every request is
//! reserved in the [`QuotaLedger`] before it goes out.

use crate::acquirers::quota::{QuotaLedger, DAILY_BUDGET};
use crate::config::SourcesConfig;
use crate::decimal::{parse_decimal, parse_price};
use crate::error::{CollectorError, CollectorResult};
use crate::models::{FundKind, Market, NewEtfQuote};
use crate::repositories::FondoStore;
use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SOURCE_NAME: &str = "alpha_vantage";

/// A fund tracked by the acquirer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub ticker: &'static str,
    pub name: &'static str,
    pub kind: FundKind,
    pub market: Market,
}

const fn us_etf(ticker: &'static str, name: &'static str) -> WatchlistEntry {
    WatchlistEntry {
        ticker,
        name,
        kind: FundKind::Etf,
        market: Market::Us,
    }
}

/// Tickers quoted on each run, in request order
pub const WATCHLIST: [WatchlistEntry; 18] = [
    // Broad US indices
    us_etf("SPY", "SPDR S&P 500 ETF"),
    us_etf("QQQ", "Invesco QQQ Trust (Nasdaq 100)"),
    us_etf("VOO", "Vanguard S&P 500 ETF"),
    us_etf("VTI", "Vanguard Total Stock Market ETF"),
    us_etf("IWM", "iShares Russell 2000 ETF"),
    // Bonds
    us_etf("BND", "Vanguard Total Bond Market ETF"),
    us_etf("TLT", "iShares 20+ Year Treasury Bond ETF"),
    // International
    WatchlistEntry {
        ticker: "VEA",
        name: "Vanguard FTSE Developed Markets ETF",
        kind: FundKind::Etf,
        market: Market::Global,
    },
    WatchlistEntry {
        ticker: "VWO",
        name: "Vanguard FTSE Emerging Markets ETF",
        kind: FundKind::Etf,
        market: Market::Global,
    },
    WatchlistEntry {
        ticker: "EWW",
        name: "iShares MSCI Mexico ETF",
        kind: FundKind::Etf,
        market: Market::Mx,
    },
    // Sectors
    us_etf("XLK", "Technology Select Sector SPDR"),
    us_etf("XLF", "Financial Select Sector SPDR"),
    us_etf("XLE", "Energy Select Sector SPDR"),
    // Commodities
    us_etf("GLD", "SPDR Gold Shares"),
    us_etf("SLV", "iShares Silver Trust"),
    // Others
    us_etf("ARKK", "ARK Innovation ETF"),
    us_etf("VNQ", "Vanguard Real Estate ETF"),
    us_etf("SCHD", "Schwab US Dividend Equity ETF"),
];

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

impl GlobalQuote {
    fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.price.is_none() && self.change_percent.is_none()
    }
}

/// What a single GLOBAL_QUOTE answer means for the run
#[derive(Debug)]
enum QuoteOutcome {
    Quote(GlobalQuote),
    /// The provider refused this symbol
    Rejected(String),
    /// The provider is throttling us; stop for the day
    Throttled(String),
    Empty,
}

impl From<GlobalQuoteResponse> for QuoteOutcome {
    fn from(response: GlobalQuoteResponse) -> Self {
        if let Some(msg) = response.error_message {
            return QuoteOutcome::Rejected(msg);
        }
        if let Some(msg) = response.note.or(response.information) {
            return QuoteOutcome::Throttled(msg);
        }
        match response.global_quote {
            Some(quote) if !quote.is_empty() => QuoteOutcome::Quote(quote),
            _ => QuoteOutcome::Empty,
        }
    }
}

pub struct EtfAcquirer {
    client: Client,
    base_url: String,
    api_key: String,
    store: Arc<dyn FondoStore>,
    ledger: QuotaLedger,
    request_delay: Duration,
}

impl EtfAcquirer {
    pub fn new(config: &SourcesConfig, store: Arc<dyn FondoStore>) -> CollectorResult<Self> {
        let api_key = config
            .alpha_vantage_api_key
            .clone()
            .ok_or_else(|| CollectorError::Config("ALPHA_VANTAGE_API_KEY is not set".to_string()))?;

        let client = Client::builder().timeout(config.http_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.alpha_vantage_base_url.trim_end_matches('/').to_string(),
            api_key,
            store,
            ledger: QuotaLedger::new(config.quota_file.clone()),
            request_delay: Duration::from_secs(1), // Default: 1 second
        })
    }

    /// Use a specific ledger instead of the configured quota file
    pub fn with_ledger(mut self, ledger: QuotaLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Set the pause between consecutive quote requests
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    /// Quote the watchlist within today's budget; returns tickers stored.
    ///
    /// Running out of budget, locally or per the provider, ends the run early
    /// and is not an error.
    pub async fn collect(&self, max_tickers: Option<usize>) -> CollectorResult<usize> {
        let remaining = self.ledger.remaining();
        info!("Quote calls remaining today: {}/{}", remaining, DAILY_BUDGET);

        if remaining == 0 {
            warn!("No quote calls left today, skipping ETF collection");
            return Ok(0);
        }

        let count = WATCHLIST
            .len()
            .min(remaining as usize)
            .min(max_tickers.unwrap_or(usize::MAX));
        info!("Quoting {} ETFs", count);

        let mut stored = 0;
        for entry in WATCHLIST.iter().take(count) {
            if let Err(e) = self.ledger.reserve() {
                warn!("{}", e);
                break;
            }

            match self.fetch_quote(entry.ticker).await {
                Ok(QuoteOutcome::Quote(quote)) => {
                    if self.store_quote(entry, quote).await? {
                        stored += 1;
                    }
                }
                Ok(QuoteOutcome::Rejected(msg)) => {
                    warn!("{}: rejected by provider: {}", entry.ticker, msg);
                }
                Ok(QuoteOutcome::Throttled(msg)) => {
                    warn!("{}", CollectorError::QuotaExhausted(msg));
                    break;
                }
                Ok(QuoteOutcome::Empty) => {
                    warn!("{}: no quote available", entry.ticker);
                }
                Err(e) => {
                    error!("{}: failed to fetch quote: {}", entry.ticker, e);
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        info!(
            "ETF collection finished: {} stored, {}/{} calls left",
            stored,
            self.ledger.remaining(),
            DAILY_BUDGET
        );
        Ok(stored)
    }

    async fn fetch_quote(&self, ticker: &str) -> CollectorResult<QuoteOutcome> {
        debug!("Requesting GLOBAL_QUOTE for {}", ticker);

        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", ticker),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectorError::UnexpectedStatus {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }

        let body: GlobalQuoteResponse = response.json().await?;
        Ok(body.into())
    }

    /// Upsert one quote; false when the row was rejected by the store
    async fn store_quote(&self, entry: &WatchlistEntry, quote: GlobalQuote) -> CollectorResult<bool> {
        let row = quote_row(entry, &quote);
        match self.store.upsert(&row).await {
            Ok(()) => {
                info!(
                    "{}: price {} ytd {}",
                    entry.ticker,
                    display_opt(row.current_price),
                    display_opt(row.ytd_return)
                );
                Ok(true)
            }
            Err(e) if e.is_row_level() => {
                warn!("{}: not stored: {}", entry.ticker, e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn quote_row(entry: &WatchlistEntry, quote: &GlobalQuote) -> NewEtfQuote {
    NewEtfQuote {
        ticker: entry.ticker.to_string(),
        name: Some(entry.name.to_string()),
        kind: Some(entry.kind),
        market: Some(entry.market),
        current_price: quote.price.as_deref().and_then(parse_price),
        // GLOBAL_QUOTE carries no annual figure
        annual_return: None,
        ytd_return: quote.change_percent.as_deref().and_then(parse_decimal),
        observed_on: Local::now().date_naive(),
    }
}

fn display_opt(value: Option<rust_decimal::Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use std::str::FromStr;

    fn outcome(json: &str) -> QuoteOutcome {
        serde_json::from_str::<GlobalQuoteResponse>(json).unwrap().into()
    }

    #[test]
    fn test_watchlist() {
        assert_eq!(WATCHLIST.len(), 18);
        let tickers: HashSet<_> = WATCHLIST.iter().map(|e| e.ticker).collect();
        assert_eq!(tickers.len(), 18);
        assert_eq!(WATCHLIST[0].ticker, "SPY");
        assert_eq!(WATCHLIST[17].ticker, "SCHD");

        let eww = WATCHLIST.iter().find(|e| e.ticker == "EWW").unwrap();
        assert_eq!(eww.market, Market::Mx);
        assert!(WATCHLIST.iter().all(|e| e.kind == FundKind::Etf));
    }

    #[test]
    fn test_outcome_classification() {
        assert!(matches!(
            outcome(r#"{"Error Message": "Invalid API call."}"#),
            QuoteOutcome::Rejected(_)
        ));
        assert!(matches!(
            outcome(r#"{"Note": "Thank you for using Alpha Vantage!"}"#),
            QuoteOutcome::Throttled(_)
        ));
        assert!(matches!(
            outcome(r#"{"Information": "Our standard API rate limit is 25 requests per day."}"#),
            QuoteOutcome::Throttled(_)
        ));
        assert!(matches!(outcome(r#"{"Global Quote": {}}"#), QuoteOutcome::Empty));
        assert!(matches!(outcome("{}"), QuoteOutcome::Empty));
    }

    #[test]
    fn test_quote_mapping() {
        let json = r#"{"Global Quote": {
            "01. symbol": "SPY",
            "02. open": "570.4200",
            "05. price": "571.0450",
            "08. previous close": "568.2000",
            "10. change percent": "0.5007%"
        }}"#;

        let QuoteOutcome::Quote(quote) = outcome(json) else {
            panic!("expected a quote");
        };
        let row = quote_row(&WATCHLIST[0], &quote);

        assert_eq!(row.ticker, "SPY");
        assert_eq!(row.current_price.unwrap().to_string(), "571.04");
        assert_eq!(row.ytd_return, Some(Decimal::from_str("0.5007").unwrap()));
        assert_eq!(row.annual_return, None);
        assert_eq!(row.kind, Some(FundKind::Etf));
        assert_eq!(row.market, Some(Market::Us));
        assert!(row.validate().is_ok());
    }
}
