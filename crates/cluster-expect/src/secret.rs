//! Reversible credential obfuscation.
//!
//! This is a base64 transform, **not encryption**. It exists so a password
//! pasted into a notebook or a scratch file does not read as plain text in
//! a casual listing — nothing more. Anyone holding the encoded string can
//! recover the secret. If real protection is needed, delegate to a secret
//! store and pass the recovered password straight to `connect`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Obfuscate a secret for casual-listing purposes.
///
/// The output is standard base64; treat it as equivalent to the plain
/// text for any security consideration.
#[must_use]
pub fn obfuscate(secret: &str) -> String {
    STANDARD.encode(secret.as_bytes())
}

/// Reverse [`obfuscate`].
pub fn deobfuscate(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::encoding(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::encoding(format!("not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let secret = "correct horse battery staple";
        let encoded = obfuscate(secret);
        assert_ne!(encoded, secret);
        assert_eq!(deobfuscate(&encoded).unwrap(), secret);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let encoded = format!("  {}\n", obfuscate("hunter2"));
        assert_eq!(deobfuscate(&encoded).unwrap(), "hunter2");
    }

    #[test]
    fn rejects_garbage() {
        let err = deobfuscate("not!!base64").unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
    }
}
