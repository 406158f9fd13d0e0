use crate::scrapers::error::PriceParseError;

/// Parse a Brazilian currency label such as `"R$ 1.234,56"` into `1234.56`.
///
/// The `R$` prefix is optional; `.` is the thousands separator and `,` the
/// decimal separator.
pub fn parse_price(text: &str) -> Result<f64, PriceParseError> {
    let invalid = || PriceParseError {
        input: text.to_string(),
    };

    let trimmed = text.trim();
    let amount = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
    let normalized = amount.replace('.', "").replace(',', ".");

    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }

    let value: f64 = normalized.parse().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}
