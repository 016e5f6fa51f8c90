// src/format.rs
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use std::str::FromStr;

const GROUP_SEPARATOR: char = '\u{202f}';
const CURRENCY_SUFFIX: &str = "\u{a0}€";

/// When a sign is printed in front of a formatted amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignDisplay {
    Always,
    Never,
    #[default]
    Auto,
    ExceptZero,
}

/// Formats an amount in euros the way the fr-FR locale does: `1 234,56 €`.
///
/// Amounts are rounded to cents, half away from zero. `None` formats as an
/// empty string.
pub fn format_price(amount: Option<f64>, sign_display: SignDisplay) -> String {
    let amount = match amount {
        Some(amount) => amount,
        None => return String::new(),
    };
    if amount.is_nan() {
        return format!("NaN{}", CURRENCY_SUFFIX);
    }

    let negative = amount.is_sign_negative();
    let (digits, is_zero) = if amount.is_infinite() {
        ("∞".to_string(), false)
    } else {
        let (integer, fraction, is_zero) = split_cents(amount.abs());
        (
            format!("{},{}", group_thousands(&integer), fraction),
            is_zero,
        )
    };

    let sign = match sign_display {
        SignDisplay::Never => "",
        SignDisplay::Auto if negative => "-",
        SignDisplay::Auto => "",
        SignDisplay::Always if negative => "-",
        SignDisplay::Always => "+",
        SignDisplay::ExceptZero if is_zero => "",
        SignDisplay::ExceptZero if negative => "-",
        SignDisplay::ExceptZero => "+",
    };
    format!("{}{}{}", sign, digits, CURRENCY_SUFFIX)
}

/// Integer digits, two fraction digits, and whether the rounded value is zero.
fn split_cents(amount: f64) -> (String, String, bool) {
    let decimal = Decimal::from_str(&amount.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(amount));
    let text = match decimal {
        Some(decimal) => {
            let rounded = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.2}", rounded)
        }
        None => format!("{:.2}", amount),
    };
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let is_zero = integer.chars().chain(fraction.chars()).all(|c| c == '0');
    (integer.to_string(), fraction.to_string(), is_zero)
}

fn group_thousands(integer: &str) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3 * 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }
    grouped
}

/// Replaces every empty-string value with `null`. Other values, including
/// `0` and `false`, are left alone.
pub fn patch_empty_string(mut fields: Map<String, Value>) -> Map<String, Value> {
    for value in fields.values_mut() {
        if value.as_str() == Some("") {
            *value = Value::Null;
        }
    }
    fields
}
