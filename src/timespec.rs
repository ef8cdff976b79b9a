// Duration literals used for uptime limits

use crate::error::{Result, UptimemonError};

/// Seconds multipliers for the accepted duration suffixes
const SUFFIXES: [(char, u64); 4] = [('s', 1), ('m', 60), ('h', 60 * 60), ('d', 60 * 60 * 24)];

/// Parse a duration into seconds
///
/// Accepts a plain non-negative integer (`600`) or an integer followed by a
/// single `s`, `m`, `h` or `d` suffix (`10m`). Suffixes are case-insensitive.
pub fn parse_duration(text: &str) -> Result<u64> {
    let invalid = || UptimemonError::InvalidDuration(text.to_string());

    let lowered = text.to_ascii_lowercase();
    let (digits, multiplier) = match lowered.chars().last() {
        Some(last) => match SUFFIXES.iter().find(|(suffix, _)| *suffix == last) {
            Some((_, multiplier)) => (&lowered[..lowered.len() - 1], *multiplier),
            None => (lowered.as_str(), 1),
        },
        None => return Err(invalid()),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Parse a `name=duration` pair
///
/// Exactly one `=` is required. The name is returned as given and may be a
/// bare program name or a `group:name` qualified form.
pub fn parse_name_time(text: &str) -> Result<(String, u64)> {
    let mut parts = text.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(value), None) => {
            let seconds = parse_duration(value)?;
            Ok((name.to_string(), seconds))
        }
        _ => Err(UptimemonError::InvalidNameTime(text.to_string())),
    }
}
