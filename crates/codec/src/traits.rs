//! Cipher trait for the AEAD backend.

use crate::error::CodecError;

/// Length of the AEAD nonce (the envelope IV), in bytes.
pub const IV_LEN: usize = 12;

/// Authenticated encryption with a caller-supplied nonce.
///
/// Tokens derive their IV from the plaintext, so unlike a typical AEAD
/// wrapper the nonce is an input here rather than something the backend
/// generates. The returned ciphertext carries the authentication tag.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` under `key` with the given nonce.
    fn encrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8; IV_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CodecError>;

    /// Decrypt a ciphertext produced by [`encrypt`](Self::encrypt).
    ///
    /// Authentication failure must surface as [`CodecError::DecryptionFailed`].
    fn decrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8; IV_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CodecError>;
}
