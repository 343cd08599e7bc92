use std::fmt;

/// Prices are integer cents so stock valuations stay exact.
/// 1250 cents = 12.50 in the ledger currency.
pub type Cents = i64;

/// Format cents as a decimal string.
/// Example: 1250 -> "12.50", -90 -> "-0.90"
pub fn format_cents(cents: Cents) -> String {
    let units = (cents / 100).abs();
    let remainder = (cents % 100).abs();
    if cents < 0 {
        format!("-{}.{:02}", units, remainder)
    } else {
        format!("{}.{:02}", units, remainder)
    }
}

/// Parse a decimal string into cents.
/// Example: "12.50" -> 1250, "8" -> 800, ".5" -> 50
/// Digits beyond two decimal places are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParsePriceError> {
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return Err(ParsePriceError::InvalidFormat);
    }

    let (units_part, frac_part) = match body.split_once('.') {
        Some((units, frac)) => (units, frac),
        None => (body, ""),
    };
    if frac_part.contains('.') {
        return Err(ParsePriceError::InvalidFormat);
    }

    let units: i64 = if units_part.is_empty() {
        0
    } else {
        units_part
            .parse()
            .map_err(|_| ParsePriceError::InvalidFormat)?
    };
    let frac: i64 = match frac_part.len() {
        0 => 0,
        1 => {
            frac_part
                .parse::<i64>()
                .map_err(|_| ParsePriceError::InvalidFormat)?
                * 10
        }
        _ => frac_part
            .get(..2)
            .ok_or(ParsePriceError::InvalidFormat)?
            .parse()
            .map_err(|_| ParsePriceError::InvalidFormat)?,
    };

    let cents = units * 100 + frac;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePriceError {
    InvalidFormat,
}

impl fmt::Display for ParsePriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePriceError::InvalidFormat => write!(f, "invalid price format"),
        }
    }
}

impl std::error::Error for ParsePriceError {}
