//! Phone number canonicalization for outbound SMS.

/// Normalizes a phone number to E.164, assuming US numbers when no country
/// code is present.
///
/// Rules: an already `+`-prefixed number passes through unchanged; 10 digits
/// get a `+1` country code; 11 digits with a leading `1` get a `+`; anything
/// else falls back to a best-effort `+1` prefix over the stripped digits.
pub fn normalize_us(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        return trimmed.to_string();
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("+1{digits}"),
        11 if digits.starts_with('1') => format!("+{digits}"),
        _ => format!("+1{digits}"),
    }
}
