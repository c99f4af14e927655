#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tasas_backend::config::SourcesConfig;
use tasas_backend::error::RepositoryError;
use tasas_backend::models::*;
use tasas_backend::repositories::*;
use tokio::net::TcpListener;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server failed");
    });
    format!("http://{}", addr)
}

/// Sources pointing every upstream at `base_url`, with both keys set
pub fn sources_config(base_url: &str, quota_file: &Path) -> SourcesConfig {
    SourcesConfig {
        banxico_api_key: Some("test-token".to_string()),
        alpha_vantage_api_key: Some("test-key".to_string()),
        banxico_base_url: base_url.to_string(),
        alpha_vantage_base_url: base_url.to_string(),
        sofipo_url: format!("{}/sofipos", base_url),
        quota_file: quota_file.to_path_buf(),
        http_timeout_secs: 5,
    }
}

// ============================================================================
// IN-MEMORY STORES
// ============================================================================

/// CETES store keyed like the `cetes` table
#[derive(Default)]
pub struct MemoryCetesStore {
    rows: Mutex<Vec<CetesAuction>>,
}

impl MemoryCetesStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self) -> Vec<CetesAuction> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, maturity: Maturity, rate: &str, auction_date: NaiveDate) {
        let row = NewCetesAuction::new(maturity, dec(rate), auction_date);
        self.insert_row(&row).expect("seed row is valid");
    }

    fn insert_row(&self, auction: &NewCetesAuction) -> RepoResult<bool> {
        auction.validate().map_err(RepositoryError::InvalidInput)?;
        let mut rows = self.rows.lock().unwrap();
        let exists = rows.iter().any(|r| {
            r.maturity_days == auction.maturity.days() && r.auction_date == auction.auction_date
        });
        if exists {
            return Ok(false);
        }
        let id = rows.len() as i64 + 1;
        rows.push(CetesAuction {
            id,
            maturity_days: auction.maturity.days(),
            rate: auction.rate,
            auction_date: auction.auction_date,
            maturity_date: auction.maturity_date,
        });
        Ok(true)
    }

    fn newest_first(&self, maturity_days: i32) -> Vec<CetesAuction> {
        let mut rows: Vec<_> = self
            .rows()
            .into_iter()
            .filter(|r| r.maturity_days == maturity_days)
            .collect();
        rows.sort_by_key(|r| Reverse(r.auction_date));
        rows
    }
}

#[async_trait]
impl CetesStore for MemoryCetesStore {
    async fn upsert(&self, auction: &NewCetesAuction) -> RepoResult<bool> {
        self.insert_row(auction)
    }

    async fn upsert_batch(&self, auctions: &[NewCetesAuction]) -> RepoResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for auction in auctions {
            match self.insert_row(auction) {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => outcome.unchanged += 1,
                Err(_) => outcome.failed += 1,
            }
        }
        Ok(outcome)
    }

    async fn latest_per_maturity(&self) -> RepoResult<Vec<CetesAuction>> {
        Ok(Maturity::ALL
            .iter()
            .filter_map(|m| self.newest_first(m.days()).into_iter().next())
            .collect())
    }

    async fn recent_for_maturity(&self, maturity_days: i32, limit: i64) -> RepoResult<Vec<CetesAuction>> {
        let mut rows = self.newest_first(maturity_days);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn latest_for_maturity(&self, maturity_days: i32) -> RepoResult<Option<CetesAuction>> {
        Ok(self.newest_first(maturity_days).into_iter().next())
    }

    async fn history(&self, query: &CetesHistoryQuery) -> RepoResult<Vec<CetesAuction>> {
        let mut rows: Vec<_> = self
            .newest_first(query.maturity_days)
            .into_iter()
            .filter(|r| query.from.map_or(true, |from| r.auction_date >= from))
            .filter(|r| query.to.map_or(true, |to| r.auction_date <= to))
            .collect();
        rows.truncate(query.limit as usize);
        Ok(rows)
    }
}

/// Append-only SOFIPO store
#[derive(Default)]
pub struct MemorySofipoStore {
    rows: Mutex<Vec<SofipoSnapshot>>,
}

impl MemorySofipoStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self) -> Vec<SofipoSnapshot> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, name: &str, nominal: Option<&str>, real: Option<&str>, observed_on: NaiveDate) {
        let snapshot = NewSofipoSnapshot {
            name: name.to_string(),
            gat_nominal: nominal.map(dec),
            gat_real: real.map(dec),
            observed_on,
        };
        self.insert_row(&snapshot).expect("seed row is valid");
    }

    fn insert_row(&self, snapshot: &NewSofipoSnapshot) -> RepoResult<i64> {
        snapshot.validate().map_err(RepositoryError::InvalidInput)?;
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(SofipoSnapshot {
            id,
            name: snapshot.name.trim().to_string(),
            gat_nominal: snapshot.gat_nominal,
            gat_real: snapshot.gat_real,
            observed_on: snapshot.observed_on,
        });
        Ok(id)
    }
}

#[async_trait]
impl SofipoStore for MemorySofipoStore {
    async fn insert(&self, snapshot: &NewSofipoSnapshot) -> RepoResult<i64> {
        self.insert_row(snapshot)
    }

    async fn insert_batch(&self, snapshots: &[NewSofipoSnapshot]) -> RepoResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for snapshot in snapshots {
            match self.insert_row(snapshot) {
                Ok(_) => outcome.inserted += 1,
                Err(_) => outcome.failed += 1,
            }
        }
        Ok(outcome)
    }

    async fn top(&self, limit: i64) -> RepoResult<Vec<SofipoSnapshot>> {
        let mut rows: Vec<_> = self
            .rows()
            .into_iter()
            .filter(|r| r.gat_nominal.is_some())
            .collect();
        rows.sort_by(|a, b| {
            b.gat_nominal
                .cmp(&a.gat_nominal)
                .then(a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list(&self, query: &SofipoListQuery) -> RepoResult<Vec<SofipoSnapshot>> {
        let mut rows = self.rows();
        rows.sort_by(|a, b| {
            let order = match query.order_by {
                SofipoOrder::GatNominal => desc_nulls_last(a.gat_nominal, b.gat_nominal),
                SofipoOrder::GatReal => desc_nulls_last(a.gat_real, b.gat_real),
                SofipoOrder::Name => b.name.cmp(&a.name),
            };
            order.then(a.id.cmp(&b.id))
        });
        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<SofipoSnapshot>> {
        Ok(self.rows().into_iter().find(|r| r.id == id))
    }
}

fn desc_nulls_last(a: Option<Decimal>, b: Option<Decimal>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Fund store keyed like `fondos_etfs`
#[derive(Default)]
pub struct MemoryFondoStore {
    rows: Mutex<Vec<EtfQuote>>,
}

impl MemoryFondoStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self) -> Vec<EtfQuote> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, ticker: &str, price: Option<&str>, ytd: Option<&str>, observed_on: NaiveDate) {
        let quote = NewEtfQuote {
            ticker: ticker.to_string(),
            name: Some(format!("{} ETF", ticker)),
            kind: Some(FundKind::Etf),
            market: Some(Market::Us),
            current_price: price.map(dec),
            annual_return: None,
            ytd_return: ytd.map(dec),
            observed_on,
        };
        self.upsert_row(&quote).expect("seed row is valid");
    }

    fn upsert_row(&self, quote: &NewEtfQuote) -> RepoResult<()> {
        quote.validate().map_err(RepositoryError::InvalidInput)?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows
            .iter_mut()
            .find(|r| r.ticker == quote.ticker && r.observed_on == quote.observed_on)
        {
            existing.current_price = quote.current_price;
            existing.annual_return = quote.annual_return;
            existing.ytd_return = quote.ytd_return;
            return Ok(());
        }
        let id = rows.len() as i64 + 1;
        rows.push(EtfQuote {
            id,
            ticker: quote.ticker.clone(),
            name: quote.name.clone(),
            kind: quote.kind.map(|k| k.as_str().to_string()),
            market: quote.market.map(|m| m.as_str().to_string()),
            current_price: quote.current_price,
            annual_return: quote.annual_return,
            ytd_return: quote.ytd_return,
            observed_on: quote.observed_on,
        });
        Ok(())
    }

    fn by_ticker_newest_first(mut rows: Vec<EtfQuote>) -> Vec<EtfQuote> {
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(b.observed_on.cmp(&a.observed_on)));
        rows
    }
}

#[async_trait]
impl FondoStore for MemoryFondoStore {
    async fn upsert(&self, quote: &NewEtfQuote) -> RepoResult<()> {
        self.upsert_row(quote)
    }

    async fn top_by_ytd(&self, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let mut rows: Vec<_> = self
            .rows()
            .into_iter()
            .filter(|r| r.current_price.is_some())
            .collect();
        rows.sort_by(|a, b| {
            desc_nulls_last(a.ytd_return, b.ytd_return)
                .then(a.ticker.cmp(&b.ticker))
                .then(b.observed_on.cmp(&a.observed_on))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn top_performers(&self, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let mut rows: Vec<_> = self
            .rows()
            .into_iter()
            .filter(|r| r.ytd_return.is_some())
            .collect();
        rows.sort_by(|a, b| {
            b.ytd_return
                .cmp(&a.ytd_return)
                .then(a.ticker.cmp(&b.ticker))
                .then(b.observed_on.cmp(&a.observed_on))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list(&self, query: &FondoListQuery) -> RepoResult<Vec<EtfQuote>> {
        let rows = self
            .rows()
            .into_iter()
            .filter(|r| query.kind.is_none() || r.kind == query.kind)
            .filter(|r| query.market.is_none() || r.market == query.market)
            .collect();
        Ok(Self::by_ticker_newest_first(rows)
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn search(&self, term: &str, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let needle = term.to_lowercase();
        let rows = self
            .rows()
            .into_iter()
            .filter(|r| {
                r.ticker.to_lowercase().contains(&needle)
                    || r.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .collect();
        Ok(Self::by_ticker_newest_first(rows)
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn find_latest_by_ticker(&self, ticker: &str) -> RepoResult<Option<EtfQuote>> {
        let ticker = ticker.trim().to_uppercase();
        Ok(Self::by_ticker_newest_first(self.rows())
            .into_iter()
            .find(|r| r.ticker == ticker))
    }
}
