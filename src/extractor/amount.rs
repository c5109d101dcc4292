use std::str::FromStr;

use sqlx::types::BigDecimal;

use crate::error::AmountError;

/// A native coin amount such as `1000aioz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub amount: BigDecimal,
    pub denom: String,
}

/// Splits `<digits><denom>`: the longest leading run of digits is the
/// magnitude, the rest is the unit.
pub fn parse_coin_amount(raw: &str) -> Result<Coin, AmountError> {
    let raw = raw.trim();
    let split = raw
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    let (digits, denom) = raw.split_at(split);

    if digits.is_empty() {
        return Err(AmountError::MissingMagnitude(raw.to_string()));
    }
    if denom.is_empty() {
        return Err(AmountError::MissingDenom(raw.to_string()));
    }
    if !is_valid_denom(denom) {
        return Err(AmountError::InvalidDenom(raw.to_string()));
    }

    let amount = BigDecimal::from_str(digits)
        .map_err(|_| AmountError::MissingMagnitude(raw.to_string()))?;

    Ok(Coin {
        amount,
        denom: denom.to_string(),
    })
}

fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}
