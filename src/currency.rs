/// Numeric value of a messy price string such as "₹ 1,49,999" or "$129.99".
///
/// Everything but digits and `.` is dropped, then the longest leading decimal
/// number is read, so "1.2.3" gives 1.2. `None` when no digits remain.
pub fn parse_amount(s: &str) -> Option<f64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    parse_float_prefix(&digits)
}

/// Leading `digits[.digits]` of `s`, ignoring anything after it.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    s[..end].parse().ok()
}

/// Render a price for display: currency symbol, Indian digit grouping, no decimals.
///
/// Unparseable text comes back unchanged; an empty amount renders as zero.
pub fn format_currency(amount: &str, currency: &str) -> String {
    let value = if amount.trim().is_empty() {
        0.0
    } else {
        match parse_amount(amount) {
            Some(n) => n,
            None => return amount.to_string(),
        }
    };
    if !value.is_finite() {
        return value.to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let rounded = format!("{:.0}", value.abs().round());
    format!("{sign}{}{}", currency_symbol(currency), group_indian(&rounded))
}

pub fn currency_symbol(code: &str) -> String {
    match code.trim().to_ascii_uppercase().as_str() {
        "" | "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{other} "),
    }
}

/// en-IN grouping: the last three digits, then pairs ("14999999" -> "1,49,99,999").
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_numeric_string_gets_symbol_and_grouping() {
        let out = format_currency("19999", "INR");
        assert_eq!(out, "₹19,999");
        assert!(!out.contains('.'));
    }

    #[test]
    fn messy_strings_are_normalized() {
        assert_eq!(format_currency("₹ 1,49,999", "INR"), "₹1,49,999");
        assert_eq!(format_currency("₹ 2,499.50", "INR"), "₹2,500");
        assert_eq!(format_currency("$129.99", "USD"), "$130");
        assert_eq!(format_currency("14999999", "INR"), "₹1,49,99,999");
        assert_eq!(format_currency("999", "INR"), "₹999");
    }

    #[test]
    fn unparseable_text_is_returned_unchanged() {
        assert_eq!(format_currency("Price on request", "INR"), "Price on request");
        assert_eq!(format_currency(".", "INR"), ".");
    }

    #[test]
    fn empty_amount_is_zero() {
        assert_eq!(format_currency("", "USD"), "$0");
        assert_eq!(format_currency("  ", "INR"), "₹0");
    }

    #[test]
    fn currency_code_picks_the_symbol() {
        assert_eq!(format_currency("123456", ""), "₹1,23,456");
        assert_eq!(format_currency("₹500", "AED"), "AED 500");
        assert_eq!(format_currency("68990", "eur"), "€68,990");
    }

    #[test]
    fn float_prefix_stops_at_second_dot() {
        assert_eq!(parse_amount("1.2.3"), Some(1.2));
        assert_eq!(parse_amount(".5"), Some(0.5));
        assert_eq!(parse_amount("5."), Some(5.0));
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_float_prefix("4.3/5"), Some(4.3));
    }
}
