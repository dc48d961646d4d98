//! Codec error types.

/// Errors produced while encoding, decoding, encrypting or decrypting tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The token text is not valid transport encoding, or is too short to
    /// hold the fixed envelope header.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The envelope carries a format version this build does not understand.
    #[error("unsupported token version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// AEAD authentication failed (wrong key or corrupted ciphertext).
    #[error("decryption failed")]
    DecryptionFailed,

    /// The decrypted content does not hash to the envelope's IV.
    #[error("decrypted content failed the integrity check")]
    DecryptionIntegrityFailed,

    /// The round-trip check after encryption did not reproduce the plaintext.
    #[error("encryption could not be verified")]
    EncryptionVerificationFailed,

    /// The AEAD backend rejected its inputs.
    #[error("cipher error: {0}")]
    Cipher(String),
}
