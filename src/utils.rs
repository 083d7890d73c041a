use crate::error::ValueParseError;

/// Formats bytes as uppercase hexadecimal pairs separated by spaces.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a 16-bit word written as four hex digits, with an optional `0x` prefix.
pub(crate) fn parse_hex_word(value: &str) -> Result<u16, ValueParseError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let mut word = [0u8; 2];
    hex::decode_to_slice(digits, &mut word).map_err(|source| ValueParseError::InvalidHexWord {
        value: value.to_string(),
        source,
    })?;
    Ok(u16::from_be_bytes(word))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn format_hex_handles_empty_payload() {
        assert_eq!("<empty>", format_hex(&[]));
    }

    #[test]
    fn format_hex_formats_uppercase_pairs() {
        assert_eq!("A9 01 02 9A", format_hex(&[0xA9, 0x01, 0x02, 0x9A]));
    }

    #[rstest]
    #[case("0102", 0x0102)]
    #[case("0x172e", 0x172E)]
    #[case("0XFFFF", 0xFFFF)]
    fn parse_hex_word_accepts_four_digits(#[case] value: &str, #[case] expected: u16) {
        assert_eq!(expected, parse_hex_word(value).expect("word should parse"));
    }

    #[rstest]
    #[case("102")]
    #[case("0x10203")]
    #[case("zz00")]
    fn parse_hex_word_rejects_malformed_words(#[case] value: &str) {
        assert_matches!(
            parse_hex_word(value),
            Err(ValueParseError::InvalidHexWord { .. })
        );
    }
}
