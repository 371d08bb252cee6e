//! Text codec: any Unicode string to URL-carriable ASCII and back.
//!
//! The portable form is standard base64 over the UTF-8 bytes. This is the
//! byte layout every legacy link and every lockbox link uses, so it must not
//! change. Decoding is lenient about missing `=` padding because some chat
//! apps strip trailing `=` from links.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::DecodeError;

const PORTABLE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Render `text` as portable ASCII. Never fails.
#[must_use]
pub fn to_portable(text: &str) -> String {
    PORTABLE.encode(text.as_bytes())
}

/// Recover the string produced by [`to_portable`].
///
/// # Errors
///
/// - [`DecodeError::Alphabet`] if `ascii` is not base64 or is truncated.
/// - [`DecodeError::Utf8`] if the decoded bytes are not UTF-8.
pub fn from_portable(ascii: &str) -> Result<String, DecodeError> {
    let bytes = PORTABLE
        .decode(ascii.trim())
        .map_err(|e| DecodeError::Alphabet {
            alphabet: "base64",
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| DecodeError::Utf8 {
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_multibyte() {
        for text in ["", "Milk", "Crème brûlée", "買い物リスト", "🛒🥛 x2", "a\u{0}b"] {
            assert_eq!(from_portable(&to_portable(text)).unwrap(), text);
        }
    }

    #[test]
    fn matches_browser_btoa_of_utf8() {
        // btoa(unescape(encodeURIComponent('{"t":"Milk","i":[]}')))
        assert_eq!(
            to_portable(r#"{"t":"Milk","i":[]}"#),
            "eyJ0IjoiTWlsayIsImkiOltdfQ=="
        );
        assert_eq!(to_portable("é"), "w6k=");
    }

    #[test]
    fn accepts_stripped_padding() {
        assert_eq!(from_portable("w6k").unwrap(), "é");
    }

    #[test]
    fn rejects_foreign_alphabet() {
        assert!(matches!(
            from_portable("not-a-valid-token!"),
            Err(DecodeError::Alphabet { .. })
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        // 0xFF 0xFE is never valid UTF-8.
        assert!(matches!(from_portable("//4="), Err(DecodeError::Utf8 { .. })));
    }
}
