pub const ADDRESS_LEN: usize = 20;

/// Callee used by contract-creation transactions.
pub const ZERO_ADDRESS: [u8; ADDRESS_LEN] = [0; ADDRESS_LEN];

/// Returns everything after the last "0x" in `s`, or `s` itself if there is none.
///
/// This is not an address parser: malformed input and repeated prefixes are passed
/// through, e.g. `"0xab0xcd"` becomes `"cd"`.
// TODO: confirm with the EVM chaincode whether payloads containing a literal "0x"
// can reach this path before switching to a strip-leading-prefix rule.
pub fn strip_prefix(s: &str) -> &str {
    match s.rfind("0x") {
        Some(index) => &s[index + 2..],
        None => s,
    }
}

pub fn is_zero(bytes: &[u8]) -> bool {
    bytes == &ZERO_ADDRESS[..]
}

pub fn to_display(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn zero_address_hex() -> String {
    hex::encode(ZERO_ADDRESS)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("0x1234", "1234" ; "prefixed")]
    #[test_case("1234", "1234" ; "bare")]
    #[test_case("0xab0xcd", "cd" ; "last occurrence wins")]
    #[test_case("0x", "" ; "prefix only")]
    #[test_case("", "" ; "empty")]
    fn test_strip_prefix(input: &str, expected: &str) {
        assert_eq!(strip_prefix(input), expected);
    }

    #[test]
    fn test_is_zero() {
        assert!(is_zero(&ZERO_ADDRESS));

        let mut address = ZERO_ADDRESS;
        address[19] = 1;
        assert!(!is_zero(&address));

        assert!(!is_zero(&[0; 19]));
        assert!(!is_zero(&[0; 32]));
    }

    #[test]
    fn test_to_display() {
        let address = hex::decode("AABBCCDDEEFF00112233445566778899AABBCCDD").unwrap();
        assert_eq!(
            to_display(&address),
            "0xaabbccddeeff00112233445566778899aabbccdd"
        );
        assert_eq!(zero_address_hex(), "0".repeat(40));
    }
}
