//! Formatting helpers for rendering a [`Snapshot`](crate::types::Snapshot)

use serde::{Deserialize, Serialize};

/// Shown in place of an absent value
pub const PLACEHOLDER: &str = "—";

/// Changes within this band (percent) render as flat
const FLAT_BAND_PCT: f64 = 0.05;

/// Direction of a 24h change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Flat,
}

impl ChangeDirection {
    pub fn of(change_pct: Option<f64>) -> Self {
        match change_pct {
            Some(pct) if pct > FLAT_BAND_PCT => ChangeDirection::Up,
            Some(pct) if pct < -FLAT_BAND_PCT => ChangeDirection::Down,
            _ => ChangeDirection::Flat,
        }
    }
}

/// Whole dollars with thousands separators, e.g. `$67,000`
pub fn fmt_price(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("${}", group_thousands(&format!("{:.0}", price.round()))),
        None => PLACEHOLDER.to_string(),
    }
}

/// Two decimals with thousands separators, e.g. `92.35`
pub fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => group_thousands(&format!("{rate:.2}")),
        None => PLACEHOLDER.to_string(),
    }
}

/// Signed percentage with two decimals, e.g. `+1.20%`
pub fn fmt_change(change_pct: Option<f64>) -> Option<String> {
    change_pct.map(|pct| {
        let sign = if pct >= 0.0 { "+" } else { "" };
        format!("{sign}{pct:.2}%")
    })
}

/// Inserts `,` every three digits of the integer part
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
