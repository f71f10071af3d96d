use std::fmt;

/// Credits are whole integer units. Deltas are signed; stored balances
/// are never negative.
pub type Credits = i64;

/// Format a signed credit amount with an explicit sign.
/// Example: 10 -> "+10", -5 -> "-5", 0 -> "0"
pub fn format_delta(credits: Credits) -> String {
    if credits > 0 {
        format!("+{}", credits)
    } else {
        format!("{}", credits)
    }
}

/// Parse a credit amount from a string.
/// Accepts an optional leading sign: "50", "+50", "-25".
pub fn parse_credits(input: &str) -> Result<Credits, ParseCreditsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCreditsError::InvalidFormat);
    }
    input
        .trim_start_matches('+')
        .parse()
        .map_err(|_| ParseCreditsError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCreditsError {
    InvalidFormat,
}

impl fmt::Display for ParseCreditsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCreditsError::InvalidFormat => write!(f, "invalid credit amount"),
        }
    }
}

impl std::error::Error for ParseCreditsError {}
