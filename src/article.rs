/// Render article codes of the `4022` range in their dotted form
/// (`402243612012` becomes `4022.436.12012`). Anything else is returned as-is.
pub fn format_article(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with("4022") && digits.len() > 7 {
        format!("{}.{}.{}", &digits[..4], &digits[4..7], &digits[7..])
    } else {
        value.to_string()
    }
}
