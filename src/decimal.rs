//! Locale-tolerant parsing of rates, percentages and prices.
//!
//! Upstream sources publish numbers as text: `"10.25"`, `"14,20 %"`, `"1,234.50"`,
//! or a no-data marker such as `"N/E"`. Everything here lands in [`Decimal`];
//! binary floating point never touches a rate or a price.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Markers that mean "no value published"
const NO_DATA_MARKERS: [&str; 3] = ["-", "N/A", "N/E"];

/// Scale applied to prices before they are stored
pub const PRICE_SCALE: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalParseError {
    #[error("ambiguous separators in '{0}'")]
    AmbiguousSeparators(String),

    #[error("not a number: '{0}'")]
    Invalid(String),
}

/// Parse text into a decimal, distinguishing "no data" from "garbage".
///
/// Returns `Ok(None)` for blank input and the no-data markers, `Err` when the
/// text carries something that is not a number.
pub fn try_parse_decimal(text: &str) -> Result<Option<Decimal>, DecimalParseError> {
    let trimmed = text.trim();
    let without_percent = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();

    if without_percent.is_empty()
        || NO_DATA_MARKERS
            .iter()
            .any(|marker| without_percent.eq_ignore_ascii_case(marker))
    {
        return Ok(None);
    }

    let normalized = normalize_separators(without_percent)?;

    Decimal::from_str(&normalized)
        .map(Some)
        .map_err(|_| DecimalParseError::Invalid(text.to_string()))
}

/// Parse text into a decimal, folding every failure into `None`
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    try_parse_decimal(text).ok().flatten()
}

/// Parse a price and quantise it to [`PRICE_SCALE`] decimal places
pub fn parse_price(text: &str) -> Option<Decimal> {
    parse_decimal(text).map(quantize_price)
}

/// Round half-to-even to exactly two places
pub fn quantize_price(value: Decimal) -> Decimal {
    let mut price = value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven);
    price.rescale(PRICE_SCALE);
    price
}

fn normalize_separators(text: &str) -> Result<String, DecimalParseError> {
    let commas = text.matches(',').count();
    if commas == 0 {
        return Ok(text.to_string());
    }

    match text.find('.') {
        // "14,20" -> "14.20"
        None if commas == 1 => Ok(text.replacen(',', ".", 1)),
        // "1,234.50" -> "1234.50"
        Some(point) if text.rfind(',').is_some_and(|last| last < point) => {
            Ok(text.replace(',', ""))
        }
        _ => Err(DecimalParseError::AmbiguousSeparators(text.to_string())),
    }
}
