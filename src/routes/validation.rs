use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};

/// Largest amount a money field accepts (ten digits, two of them decimals)
const MAX_AMOUNT_UNITS: i64 = 100_000_000;

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// Parse a money amount typed by a user or staff member
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("Invalid amount: {}", raw.trim())))?;
    validate_amount(amount)
}

/// Amounts must be positive, have at most two decimal places and stay
/// below 100 000 000
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    let amount = amount.normalize();
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if amount.scale() > 2 {
        return Err(AppError::InvalidInput(
            "Amount can have at most 2 decimal places".to_string(),
        ));
    }
    if amount >= Decimal::from(MAX_AMOUNT_UNITS) {
        return Err(AppError::InvalidInput("Amount is too large".to_string()));
    }
    Ok(amount)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountField {
    Text(String),
    Number(serde_json::Number),
}

/// Accept a JSON amount written either as a number or as a string
///
/// Numbers go through their textual form so `0.1` stays exactly `0.1`.
pub fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match AmountField::deserialize(deserializer)? {
        AmountField::Text(text) => text,
        AmountField::Number(number) => number.to_string(),
    };
    Decimal::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

/// Trim an optional text field, mapping blank to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
