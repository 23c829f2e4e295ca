//! The address module holds the textual form of addresses: fixed-length hex
//! with the EIP-55 mixed-case checksum convention.

use crate::error::{AbiError, Result};
use ethers::types::Address;
use ethers::utils::to_checksum;

/// Renders the canonical checksummed text form of an address.
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}

/// Parses an address from its textual form.
///
/// All-lowercase and all-uppercase hex digits are accepted as written; any
/// mixed-case input must match the checksum rendering exactly, so a corrupted
/// address cannot slip through as a plausible-looking one.
pub fn parse_checksummed(text: &str) -> Result<Address> {
    let address: Address = text.parse().map_err(|e| {
        AbiError::MalformedAbiData(format!("`{text}` is not a hex address: {e}"))
    })?;

    let digits = text.trim_start_matches("0x");
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksummed(&address) != text {
        return Err(AbiError::MalformedAbiData(format!(
            "`{text}` fails its checksum"
        )));
    }
    Ok(address)
}

#[cfg(test)]
mod test {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn renders_the_checksum_form() {
        let address: Address = CHECKSUMMED.to_lowercase().parse().unwrap();
        assert_eq!(checksummed(&address), CHECKSUMMED);
    }

    #[test]
    fn accepts_checksummed_and_lowercase() {
        assert!(parse_checksummed(CHECKSUMMED).is_ok());
        assert!(parse_checksummed(&CHECKSUMMED.to_lowercase()).is_ok());
    }

    #[test]
    fn rejects_corrupted_case() {
        // Flip the case of one checksummed letter.
        let corrupted = CHECKSUMMED.replacen("aA", "aa", 1);
        assert!(parse_checksummed(&corrupted).is_err());
    }

    #[test]
    fn rejects_non_addresses() {
        assert!(parse_checksummed("0x1234").is_err());
        assert!(parse_checksummed("not an address").is_err());
    }
}
