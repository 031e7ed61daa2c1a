use thiserror::Error;

/// Money is held as integer cents, so sums and differences are exact.
/// 1 unit = 100 cents: 50.00 is stored as 5000.
pub type Cents = i64;

/// Largest amount accepted from input, ten billion units. Keeps ledger sums
/// far away from `i64` overflow.
pub const MAX_CENTS: Cents = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid money format")]
    InvalidFormat,
    #[error("amount out of range")]
    OutOfRange,
    #[error("amount below one cent")]
    BelowOneCent,
}

/// Render cents as a two-decimal string: 5000 -> "50.00", -5 -> "-0.05".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal amount into cents.
///
/// Accepts "50", "50.5", "50.05", ".5" and a leading minus sign. Digits past
/// the second decimal place are rounded half-up on the third digit, so
/// "3.335" becomes 334 and "3.334" becomes 333. A non-zero amount that
/// rounds to zero ("0.004") and anything above [`MAX_CENTS`] are rejected.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    if digits.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));
    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(units_str) || !all_digits(fraction_str) {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::OutOfRange)?
    };

    let mut fraction = fraction_str.bytes().map(|b| i64::from(b - b'0'));
    let tenths = fraction.next().unwrap_or(0);
    let hundredths = fraction.next().unwrap_or(0);
    let round_up = fraction.next().is_some_and(|d| d >= 5);

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
        .ok_or(ParseCentsError::OutOfRange)?;

    if cents > MAX_CENTS {
        return Err(ParseCentsError::OutOfRange);
    }
    if cents == 0 && fraction_str.bytes().any(|b| b != b'0') {
        return Err(ParseCentsError::BelowOneCent);
    }

    Ok(if negative { -cents } else { cents })
}

/// Cents as a currency value, for wire formats that expect decimals.
pub fn cents_to_decimal(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Nearest whole cent of a currency value, with the same limits as
/// [`parse_cents`].
pub fn decimal_to_cents(value: f64) -> Result<Cents, ParseCentsError> {
    if !value.is_finite() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let cents = (value * 100.0).round();
    if cents.abs() > MAX_CENTS as f64 {
        return Err(ParseCentsError::OutOfRange);
    }
    if cents == 0.0 && value != 0.0 {
        return Err(ParseCentsError::BelowOneCent);
    }
    Ok(cents as Cents)
}

/// Serde adapter that writes a `Cents` field as a decimal currency value
/// (`5000` <-> `50.0`).
pub mod decimal {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Cents, cents_to_decimal, decimal_to_cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(cents_to_decimal(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let value = f64::deserialize(deserializer)?;
        decimal_to_cents(value).map_err(D::Error::custom)
    }
}
