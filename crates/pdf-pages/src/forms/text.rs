//! PDF text string and name conversions

use lopdf::{Object, StringFormat};

/// Decode a text string: UTF-16BE when it carries a BOM, otherwise treated
/// as Latin-1 (a close stand-in for PDFDocEncoding).
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode as a literal string, switching to UTF-16BE outside ASCII
pub(crate) fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Text of a string or name object
pub(crate) fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_round_trip() {
        let Object::String(bytes, _) = encode_text("Zoë") else {
            panic!("expected string");
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text(&bytes), "Zoë");
    }

    #[test]
    fn test_ascii_stays_literal() {
        assert!(matches!(
            encode_text("Jane"),
            Object::String(bytes, StringFormat::Literal) if bytes == b"Jane"
        ));
    }
}
