//! Response parsing for scan and probe replies

use crate::error::ParseError;
use crate::BusAddress;

/// Parse a `SCN` response line into the list of discovered bus addresses
///
/// The expected format is a single line of space-separated decimal integers,
/// e.g. `"32 33 34"`. An empty (or all-whitespace) line is a valid empty bus.
/// Any non-numeric token fails the whole parse; a partial list is never
/// returned.
pub fn parse_scan_response(line: &str) -> Result<Vec<BusAddress>, ParseError> {
    let mut addresses = Vec::new();
    for token in line.split_whitespace() {
        let addr = token
            .parse::<BusAddress>()
            .map_err(|_| match token.chars().all(|c| c.is_ascii_digit()) {
                true => ParseError::AddressOutOfRange(token.to_string()),
                false => ParseError::BadScanToken(token.to_string()),
            })?;
        addresses.push(addr);
    }
    Ok(addresses)
}

/// Check a `TST` response line for liveness
///
/// The probe reply is opaque; any non-empty text counts as alive.
pub fn is_probe_ack(line: &str) -> bool {
    !line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_address_list() {
        assert_eq!(parse_scan_response("32 33 34").unwrap(), vec![32, 33, 34]);
    }

    #[test]
    fn empty_scan_is_empty_bus() {
        assert_eq!(parse_scan_response("").unwrap(), Vec::<BusAddress>::new());
        assert_eq!(parse_scan_response("   ").unwrap(), Vec::<BusAddress>::new());
    }

    #[test]
    fn non_numeric_token_fails_whole_parse() {
        let err = parse_scan_response("32 oops 34").unwrap_err();
        assert_eq!(err, ParseError::BadScanToken("oops".to_string()));
    }

    #[test]
    fn oversized_address_is_rejected() {
        let err = parse_scan_response("99999999").unwrap_err();
        assert_eq!(err, ParseError::AddressOutOfRange("99999999".to_string()));
    }

    #[test]
    fn probe_ack() {
        assert!(is_probe_ack("MUX READY"));
        assert!(!is_probe_ack("  "));
    }

    proptest! {
        /// Any list of addresses formats and parses back unchanged
        #[test]
        fn scan_round_trip(addrs in proptest::collection::vec(any::<u16>(), 0..32)) {
            let line = addrs
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(parse_scan_response(&line).unwrap(), addrs);
        }
    }
}
