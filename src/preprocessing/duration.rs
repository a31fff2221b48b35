//! Разбор длительностей вида "2 anos 3 meses"

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref YEARS_RE: Regex = Regex::new(r"(\d+)\s*ano").unwrap();
    static ref MONTHS_RE: Regex = Regex::new(r"(\d+)\s*mes").unwrap();
}

/// Длительность в месяцах: `anos * 12 + meses`.
///
/// Отсутствующее или пустое значение дает `None`. Непустой текст без
/// распознанных единиц дает `Some(0)`; функция никогда не падает.
pub fn parse_duration(value: Option<&str>) -> Option<i64> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }

    let text = text.to_lowercase();
    let years = first_quantity(&YEARS_RE, &text);
    let months = first_quantity(&MONTHS_RE, &text);

    Some(years.saturating_mul(12).saturating_add(months))
}

fn first_quantity(re: &Regex, text: &str) -> i64 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}
