//! Sequential invoice numbers of the form `INV-0001`.

pub const INVOICE_PREFIX: &str = "INV";

/// Computes the number following `latest`.
///
/// The numeric part is the leading digits after the first `-`; anything
/// unparsable counts as zero. Numbers are padded to at least four digits.
pub fn next_invoice_number(latest: Option<&str>) -> String {
    let last = latest
        .and_then(|number| number.split('-').nth(1))
        .map(leading_number)
        .unwrap_or(0);
    format!("{INVOICE_PREFIX}-{:04}", last.saturating_add(1))
}

fn leading_number(segment: &str) -> u64 {
    let digits: String = segment
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}
