//! Числа и проценты, записанные текстом

/// Число с точкой или запятой в качестве десятичного разделителя.
/// Завершающий `%` отбрасывается.
pub fn parse_number(value: &str) -> Option<f64> {
    let text = value.trim();
    let text = text.strip_suffix('%').unwrap_or(text).trim();
    if text.is_empty() {
        return None;
    }

    let normalized = if text.contains(',') && !text.contains('.') {
        text.replace(',', ".")
    } else {
        text.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Процент вида "87,5%" в число 87.5
pub fn parse_percentage(value: Option<&str>) -> Option<f64> {
    value.and_then(parse_number)
}

/// Строгий разбор без запятых и процентов: так определяется числовая колонка
pub fn parse_plain_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
