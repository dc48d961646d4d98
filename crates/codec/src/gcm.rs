//! AES-256-GCM implementation of the [`Cipher`] trait.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::{
    error::CodecError,
    traits::{Cipher, IV_LEN},
};

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// AES-256-GCM AEAD cipher.
///
/// Ciphertext layout: `[encrypted bytes: N][GCM tag: 16 bytes]`. No associated
/// data is bound; the envelope header is covered by the IV recheck instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmCipher;

impl Cipher for Aes256GcmCipher {
    fn encrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8; IV_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CodecError::Cipher(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|e| CodecError::Cipher(e.to_string()))
    }

    fn decrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8; IV_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        if ciphertext.len() < TAG_LEN {
            return Err(CodecError::DecryptionFailed);
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CodecError::Cipher(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CodecError::DecryptionFailed)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const IV: [u8; IV_LEN] = [0x07; IV_LEN];

    #[test]
    fn round_trip() {
        let cipher = Aes256GcmCipher;
        let encrypted = cipher.encrypt(&KEY, &IV, b"hello mask").unwrap();
        let decrypted = cipher.decrypt(&KEY, &IV, &encrypted).unwrap();
        assert_eq!(decrypted, b"hello mask");
    }

    #[test]
    fn ciphertext_carries_tag() {
        let cipher = Aes256GcmCipher;
        let encrypted = cipher.encrypt(&KEY, &IV, b"abc").unwrap();
        assert_eq!(encrypted.len(), 3 + TAG_LEN);
    }

    #[test]
    fn same_inputs_same_ciphertext() {
        let cipher = Aes256GcmCipher;
        let a = cipher.encrypt(&KEY, &IV, b"same").unwrap();
        let b = cipher.encrypt(&KEY, &IV, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let cipher = Aes256GcmCipher;
        let encrypted = cipher.encrypt(&KEY, &IV, b"secret").unwrap();
        let result = cipher.decrypt(&[0x43; 32], &IV, &encrypted);
        assert_eq!(result, Err(CodecError::DecryptionFailed));
    }

    #[test]
    fn wrong_iv_fails() {
        let cipher = Aes256GcmCipher;
        let encrypted = cipher.encrypt(&KEY, &IV, b"secret").unwrap();
        let result = cipher.decrypt(&KEY, &[0x08; IV_LEN], &encrypted);
        assert_eq!(result, Err(CodecError::DecryptionFailed));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = Aes256GcmCipher;
        let mut encrypted = cipher.encrypt(&KEY, &IV, b"secret").unwrap();
        encrypted[0] ^= 0x01;
        let result = cipher.decrypt(&KEY, &IV, &encrypted);
        assert_eq!(result, Err(CodecError::DecryptionFailed));
    }

    #[test]
    fn too_short_ciphertext_fails() {
        let cipher = Aes256GcmCipher;
        let result = cipher.decrypt(&KEY, &IV, &[0u8; TAG_LEN - 1]);
        assert_eq!(result, Err(CodecError::DecryptionFailed));
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let cipher = Aes256GcmCipher;
        let encrypted = cipher.encrypt(&KEY, &IV, b"").unwrap();
        assert_eq!(encrypted.len(), TAG_LEN);
        let decrypted = cipher.decrypt(&KEY, &IV, &encrypted).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn large_plaintext_round_trip() {
        let cipher = Aes256GcmCipher;
        let plaintext = vec![0xAB; 100_000];
        let encrypted = cipher.encrypt(&KEY, &IV, &plaintext).unwrap();
        let decrypted = cipher.decrypt(&KEY, &IV, &encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
