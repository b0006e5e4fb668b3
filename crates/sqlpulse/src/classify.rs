//! Value classification
//!
//! Every scanned cell arrives as text; `classify` infers its semantic
//! type by attempted parsing with deterministic precedence: integer
//! first, then float, then string. Classification is total — it never
//! fails, it falls back to `String`.

use serde::Serialize;

/// A classified cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// Text that parsed as neither integer nor float
    String(String),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
}

impl ColumnValue {
    /// Short kind tag, used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
        }
    }
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Classify a raw textual cell.
///
/// Parse attempts run against the whitespace-trimmed text so padded
/// fixed-width fields still classify numerically; the `String` fallback
/// keeps the raw text untrimmed. Integer wins over float when both
/// parse ("88" is `Integer(88)`, never `Float(88.0)`).
pub fn classify(raw: &str) -> ColumnValue {
    let trimmed = raw.trim();
    if let Some(n) = parse_integer(trimmed) {
        return ColumnValue::Integer(n);
    }
    if !trimmed.is_empty() {
        if let Ok(x) = trimmed.parse::<f64>() {
            return ColumnValue::Float(x);
        }
    }
    ColumnValue::String(raw.to_string())
}

/// Parse a 64-bit signed integer with base auto-detection.
///
/// Accepts an optional sign followed by `0x`/`0o`/`0b` prefixed digits
/// (case-insensitive) or plain decimal digits.
fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = if let Some(hex) = strip_radix_prefix(digits, 'x') {
        (16, hex)
    } else if let Some(oct) = strip_radix_prefix(digits, 'o') {
        (8, oct)
    } else if let Some(bin) = strip_radix_prefix(digits, 'b') {
        (2, bin)
    } else {
        (10, digits)
    };

    if digits.is_empty() {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}

fn strip_radix_prefix(digits: &str, marker: char) -> Option<&str> {
    let rest = digits.strip_prefix('0')?;
    rest.strip_prefix(marker)
        .or_else(|| rest.strip_prefix(marker.to_ascii_uppercase()))
}
