use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use super::metrics::text_width;

/// Suffix appended to every rendered amount
pub const CURRENCY_LABEL: &str = "FCFA";

/// Placeholder rendered for timestamps that do not parse
pub const INVALID_DATE: &str = "Invalid Date";

const GROUP_SEPARATOR: char = ' ';
const DECIMAL_SEPARATOR: char = ',';
/// Digits printed past the rounding position to see the exact expansion
const EXTRA_DIGITS: usize = 40;

/// Format an amount the way the French locale prints money, e.g. `4 000,00 FCFA`.
///
/// Grouping uses a plain space so the text stays printable with the standard
/// PDF fonts. `NaN` is rendered literally.
pub fn format_currency(amount: f64) -> String {
    format!("{} {}", format_decimal(amount, 2), CURRENCY_LABEL)
}

/// Fixed-point French rendering with thousands grouping
pub fn format_decimal(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let (whole, frac) = round_half_away(value.abs(), decimals);

    let mut out = String::with_capacity(whole.len() + whole.len() / 3 + frac.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_digits(&whole));
    if !frac.is_empty() {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(&frac);
    }
    out
}

/// Digits of a non-negative `value` rounded to `decimals` places, exact ties
/// going up. Works on the exact decimal expansion of the double, so values
/// like 2.675 (stored just below the tie) still round down.
fn round_half_away(value: f64, decimals: usize) -> (String, String) {
    let exact = format!("{:.*}", decimals + EXTRA_DIGITS, value);
    let (whole, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut digits: Vec<u8> = whole.bytes().chain(frac.bytes().take(decimals)).collect();
    if frac.as_bytes().get(decimals).is_some_and(|d| *d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - decimals;
    let text = String::from_utf8_lossy(&digits).into_owned();
    (text[..split].to_string(), text[split..].to_string())
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Render a plain number the way a template literal would: integers without
/// decimals, everything else with its shortest representation.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Parse the timestamp formats the backend emits into local wall time.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, pattern) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar date, `dd/mm/yyyy`
pub fn format_date(input: &str) -> String {
    match parse_timestamp(input) {
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => INVALID_DATE.to_string(),
    }
}

/// Date and time, `dd/mm/yyyy HH:MM:SS`
pub fn format_date_time(input: &str) -> String {
    match parse_timestamp(input) {
        Some(dt) => format_local_date_time(&dt),
        None => INVALID_DATE.to_string(),
    }
}

pub fn format_local_date_time(dt: &NaiveDateTime) -> String {
    dt.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Shorten `text` until it fits in `max_width` millimetres, marking the cut
/// with an ellipsis. Text that already fits comes back unchanged, so the
/// operation is idempotent.
pub fn truncate_text(text: &str, max_width: f64, font_size: f64, bold: bool) -> String {
    let fits = |s: &str| text_width(s, font_size, bold) <= max_width;
    if fits(text) {
        return text.to_string();
    }

    let mut kept: Vec<char> = text.chars().collect();
    while !kept.is_empty() && !fits(&kept.iter().collect::<String>()) {
        kept.pop();
    }
    // the last surviving character makes room for the ellipsis
    kept.pop();

    loop {
        let candidate: String = kept.iter().chain(std::iter::once(&'…')).collect();
        if kept.is_empty() || fits(&candidate) {
            return candidate;
        }
        kept.pop();
    }
}
