//! Binary/text transcoding used by every serialized field.
//!
//! All base64 in cipherlink is the standard alphabet with padding, so the
//! wire form matches what browser and mobile hosts produce with their
//! platform encoders.

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_to_bytes(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(encoded)
}

/// UTF-8 encode text.
pub fn string_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// UTF-8 decode bytes. Fails on invalid sequences rather than substituting
/// replacement characters.
pub fn bytes_to_string(bytes: Vec<u8>) -> Result<String, std::string::FromUtf8Error> {
    String::from_utf8(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_uses_padded_standard_alphabet() {
        assert_eq!(bytes_to_base64(&[0xfb, 0xff]), "+/8=");
        assert_eq!(base64_to_bytes("+/8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_base64_rejects_url_safe_and_garbage() {
        assert!(base64_to_bytes("-_8=").is_err());
        assert!(base64_to_bytes("not base64!").is_err());
    }

    #[test]
    fn test_text_is_not_normalised() {
        let text = "  héllo\n";
        let bytes = string_to_bytes(text);
        assert_eq!(bytes_to_string(bytes).unwrap(), text);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(bytes_to_string(vec![0xc3, 0x28]).is_err());
    }
}
