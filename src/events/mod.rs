// Events module - Supervisor event listener protocol

pub mod listener;

pub use listener::{AckResult, Event, EventListener};

use std::collections::BTreeMap;

/// Parse a line of space-separated `key:value` tokens
///
/// Used both for the event header line and for TICK payloads.
pub fn parse_tokens(line: &str) -> BTreeMap<String, String> {
    line.split_whitespace()
        .filter_map(|token| token.split_once(':'))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
